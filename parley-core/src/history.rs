use parley_client::{Interaction, InteractionPage};
use tracing::warn;

use crate::message::{Message, assistant_id, user_id};
use crate::sources::format_sources;

/// Expands a page of interactions into user/assistant message pairs, oldest first.
///
/// `greeting` is prepended only when it is non-empty and `page` is the earliest
/// page of the thread (no older cursor). A missing page yields no messages.
pub fn format_history(page: Option<&InteractionPage>, greeting: Option<&str>) -> Vec<Message> {
    let Some(page) = page else {
        return Vec::new();
    };

    let mut interactions: Vec<&Interaction> = page.interactions.iter().collect();
    interactions.sort_by(|a, b| interaction_order(a).cmp(&interaction_order(b)));

    let mut messages = Vec::with_capacity(interactions.len() * 2 + 1);

    if let Some(text) = greeting.filter(|g| !g.is_empty()) {
        if page.next_page_token.is_none() {
            messages.push(Message::greeting(text));
        }
    }

    for interaction in interactions {
        let id = interaction.id.as_deref().unwrap_or("");
        messages.push(Message::user(
            user_id(id),
            interaction.user_input.clone().unwrap_or_default(),
        ));
        messages.push(assistant_message(id, interaction));
    }

    messages
}

/// Builds the finalized assistant message for an interaction.
pub(crate) fn assistant_message(id: &str, interaction: &Interaction) -> Message {
    let sources = match format_sources(&interaction.references, &interaction.ranked_results) {
        Ok(sources) => sources,
        Err(e) => {
            warn!(interaction = id, error = %e, "Dropping unresolvable sources");
            Vec::new()
        }
    };

    let mut message = Message::assistant(
        assistant_id(id),
        interaction.model_response.clone().unwrap_or_default(),
    );
    message.sources = sources;
    message.search_queries = interaction.search_queries.clone();
    message.search_results = interaction.ranked_results.clone();
    message
}

/// Numeric ids ascending; anything non-numeric after them, by text.
fn interaction_order(interaction: &Interaction) -> (u64, &str) {
    let id = interaction.id.as_deref().unwrap_or("");
    (id.parse().unwrap_or(u64::MAX), id)
}
