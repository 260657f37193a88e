pub const THINK_START: &str = "<think>";
pub const THINK_END: &str = "</think>";

/// Three-way classification instruction; the model answers with one token.
pub fn classification_prompt(query: &str) -> String {
    format!(
        "Classify the following student query into one of these categories:\n\
         - MATH: Mathematics, algebra, calculus, geometry, arithmetic, equations, numbers\n\
         - PHYSICS: Physics, forces, energy, motion, thermodynamics, electricity, mechanics\n\
         - GENERAL: General questions, greetings, or unclear topics\n\n\
         Query: {query}\n\n\
         Respond with only one word: MATH, PHYSICS, or GENERAL"
    )
}

pub fn math_prompt(query: &str) -> String {
    format!(
        "You are a mathematics tutor. Answer the following math question clearly and step-by-step.\n\
         If the question involves calculations, show your work.\n\n\
         Question: {query}\n\n\
         Provide a clear, educational response that helps the student understand the concept \
         and solution process."
    )
}

/// `constants_block` is empty or a preformatted section injected ahead of
/// the question.
pub fn physics_prompt(query: &str, constants_block: &str) -> String {
    format!(
        "You are a physics tutor. Answer the following physics question clearly and step-by-step.\n\
         Use fundamental physics principles and provide educational explanations.\n\n\
         {constants_block}\
         Question: {query}\n\n\
         Provide a clear, educational response that helps the student understand the physics \
         concepts involved."
    )
}

pub fn general_prompt(query: &str) -> String {
    format!(
        "You are a friendly tutor. Respond to the student's query helpfully.\n\
         If they're asking about topics you can help with, mention that you specialize in \
         mathematics and physics.\n\n\
         Student: {query}\n\n\
         Provide a helpful and encouraging response."
    )
}

pub fn empty_input_reply() -> String {
    "Please ask me a question about mathematics or physics, and I'll be happy to help!"
        .to_string()
}

pub fn apology_reply(detail: &str) -> String {
    format!(
        "I apologize, but I encountered an error while processing your question. Please try \
         rephrasing your query or ask about a specific mathematics or physics topic. \
         Error: {detail}"
    )
}

/// Delete the first region delimited by `start_marker`/`end_marker`, markers
/// included. No-op when either marker is missing or they appear out of order.
pub fn strip_marked_region(text: &str, start_marker: &str, end_marker: &str) -> String {
    let Some(start) = text.find(start_marker) else {
        return text.to_string();
    };
    let Some(end_rel) = text[start + start_marker.len()..].find(end_marker) else {
        return text.to_string();
    };

    let end = start + start_marker.len() + end_rel + end_marker.len();
    format!("{}{}", &text[..start], &text[end..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_marked_region_including_markers() {
        let input = "before <think>internal reasoning</think>after";
        assert_eq!(
            strip_marked_region(input, THINK_START, THINK_END),
            "before after"
        );
    }

    #[test]
    fn unbalanced_markers_are_left_alone() {
        let input = "no closing <think>dangling";
        assert_eq!(strip_marked_region(input, THINK_START, THINK_END), input);

        let reversed = "</think>out of order<think>";
        assert_eq!(
            strip_marked_region(reversed, THINK_START, THINK_END),
            reversed
        );
    }

    #[test]
    fn absent_markers_are_a_noop() {
        let input = "plain explanation";
        assert_eq!(strip_marked_region(input, THINK_START, THINK_END), input);
    }

    #[test]
    fn classification_prompt_names_all_tokens() {
        let prompt = classification_prompt("what is 2+2?");
        assert!(prompt.contains("MATH"));
        assert!(prompt.contains("PHYSICS"));
        assert!(prompt.contains("GENERAL"));
        assert!(prompt.contains("what is 2+2?"));
    }
}
