//! Prompt construction for the function-routing model round-trips.
//!
//! The routing prompt is generated from the registry's specs so prompt
//! and registry cannot drift apart.

use marquee_core::function::FunctionRegistry;
use marquee_core::message::{Conversation, Role};

/// Build the system prompt that teaches the model the dispatch protocol.
pub fn routing_prompt(registry: &FunctionRegistry) -> String {
    let signatures = registry
        .specs()
        .iter()
        .map(|s| s.signature())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You provide information about movies. When you don't have the required information, you need to provide the appropriate function to call based on the user's needs. When a function needs to be called, respond with one of the following function names:

{signatures}

Make sure to replace parameters with the appropriate values. For example, if the user asks for showtimes for the movie "The Batman" in "New York", the response should be in the following:

{{
    "functions": ["get_showtimes('The Batman', 'New York')"]
}}

If a function needs to be called, the response should only contain JSON data with the function name. For example, if the user asks for now playing movies, the response should be in the following:
{{
    "functions": ["get_now_playing_movies()"]
}}

If there are multiple functions to call, the response should contain multiple function names in the list:
{{
    "functions": ["get_now_playing_movies()", "get_showtimes('The Batman', '95112')"]
}}

If multiple functions need to be called, but more information is required first, append the callback to request the information. For example, if the user asks for now playing movies and showtimes for any random movie, append the callback function to request the information first:
{{
    "functions": ["get_now_playing_movies()", "callback()"]
}}

You can also request a specific piece of information. For example, if the user asks for showtimes for a movie, but the location is missing, you can request the location first:
{{
    "functions": ["get_showtimes('The Batman', 'callback()')"]
}}

Then, when the required information is provided, the follow-up response should call the next function with the required information. Remember to remove 'get_now_playing_movies()' from the list of functions to call once the information is provided and the next function(s) are being decided:
{{
    "functions": ["get_showtimes('The Batman', '95112')"]
}}

If there is no appropriate function to call, "functions" should be set to an empty array (i.e., [])."#
    )
}

/// Render the conversation so far into a system message body for the
/// routing round-trip. System messages (persona, injected context) are
/// skipped; the router only needs the dialogue itself.
pub fn render_transcript(conversation: &Conversation) -> String {
    let mut rendered = String::from("Conversation between the user and the assistant so far:\n");

    for message in &conversation.messages {
        let label = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::System => continue,
        };
        rendered.push_str(&format!("{label}: {}\n", message.content));
    }

    rendered
}
