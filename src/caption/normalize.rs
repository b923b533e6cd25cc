use once_cell::sync::Lazy;
use regex::Regex;

/// Filler phrases captioning models echo back. Applied in order, so longer
/// phrases are listed before the shorter phrases they contain.
const BOILERPLATE_PHRASES: [&str; 20] = [
    "describe this image",
    "this image shows",
    "in this image",
    "the image shows",
    "i can see",
    "there is",
    "there are",
    "what is happening",
    "what are they doing",
    "what can you see",
    "what objects",
    "describe the",
    "notable objects include",
    "the setting appears to be",
    "appears to be",
    "seems to be",
    "it looks like",
    "it appears",
    "what is",
    "what are",
];

/// Capitalizing or closing a sentence can recreate the prompt; bounded
/// because every pass shortens the text.
const MAX_FINISH_PASSES: usize = 4;

const LEADING_ARTICLES: [&str; 6] = ["a ", "an ", "the ", "A ", "An ", "The "];

static QA_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)[Qq]uestion\s*:.*?[Aa]nswer\s*:").unwrap());
static QA_DANGLING: Lazy<Regex> = Lazy::new(|| Regex::new(r"[Qq]uestion\s*:.*?\?").unwrap());
static ANSWER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[Aa]nswer\s*:").unwrap());
static QUESTION_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[Qq]uestion\s*:").unwrap());
static BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    BOILERPLATE_PHRASES
        .iter()
        .map(|phrase| Regex::new(&format!("(?i){}", regex::escape(phrase))).unwrap())
        .collect()
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static QUESTION_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\?\s*").unwrap());
static COLON_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*:\s*").unwrap());
static PERIOD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(?:\s*\.)+").unwrap());
static LEADING_PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s.,;:!?]+").unwrap());

/// Removes every occurrence of `prompt`, including ones that only appear
/// once an inner occurrence has been cut out.
pub fn strip_prompt(text: &str, prompt: &str) -> String {
    if prompt.is_empty() {
        return text.to_string();
    }
    let mut current = text.to_string();
    while current.contains(prompt) {
        current = current.replace(prompt, "");
    }
    current
}

/// Turns one raw model answer into a single clean sentence, or an empty
/// string when nothing usable is left.
pub fn clean_description(raw: &str, prompt: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let mut text = strip_prompt(raw, prompt).trim().to_string();

    for pattern in [&*QA_PAIR, &*QA_DANGLING, &*ANSWER_MARKER, &*QUESTION_MARKER] {
        text = pattern.replace_all(&text, "").into_owned();
    }
    for pattern in BOILERPLATE.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }

    text = WHITESPACE.replace_all(&text, " ").into_owned();
    text = QUESTION_BREAK.replace_all(&text, ". ").into_owned();
    text = COLON_BREAK.replace_all(&text, ". ").into_owned();
    text = PERIOD_RUN.replace_all(&text, ".").into_owned();
    text = LEADING_PUNCTUATION.replace(&text, "").into_owned();

    let text = drop_leading_article(text.trim());
    finish_without_prompt(text, prompt)
}

fn trim_leading_punctuation(text: &str) -> String {
    LEADING_PUNCTUATION.replace(text.trim(), "").trim().to_string()
}

/// Strips the prompt and finishes the sentence until the finished text no
/// longer contains the prompt. Empty if that never settles.
fn finish_without_prompt(text: &str, prompt: &str) -> String {
    let mut sentence = finish_sentence(&trim_leading_punctuation(&strip_prompt(text, prompt)));
    if prompt.is_empty() {
        return sentence;
    }
    for _ in 0..MAX_FINISH_PASSES {
        if !sentence.contains(prompt) {
            return sentence;
        }
        let stripped = strip_prompt(&sentence, prompt);
        sentence = finish_sentence(&trim_leading_punctuation(&stripped));
    }
    if sentence.contains(prompt) {
        String::new()
    } else {
        sentence
    }
}

/// Drops a leading article unless the next word looks like a proper noun.
fn drop_leading_article(text: &str) -> &str {
    if !LEADING_ARTICLES
        .iter()
        .any(|article| text.starts_with(article))
    {
        return text;
    }
    match text.split_once(' ') {
        Some((_, rest)) if rest.chars().next().is_some_and(char::is_lowercase) => rest,
        _ => text,
    }
}

pub(crate) fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn ends_with_terminal(text: &str) -> bool {
    text.ends_with(['.', '!', '?'])
}

fn finish_sentence(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut sentence = capitalize_first(text);
    if !ends_with_terminal(&sentence) {
        sentence.push('.');
    }
    sentence.replace("..", ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::aspect::Aspect;

    #[test]
    fn removes_echoed_question_prompt() {
        let prompt = Aspect::Action.prompt();
        let raw = format!("{prompt} a dog is running on the beach");
        assert_eq!(clean_description(&raw, prompt), "Dog is running on the beach.");
    }

    #[test]
    fn removes_question_answer_scaffolding_without_prompt() {
        let cleaned = clean_description(
            "question: what is in the background? answer: tall pine trees",
            "",
        );
        assert_eq!(cleaned, "Tall pine trees.");
    }

    #[test]
    fn removes_boilerplate_case_insensitively() {
        let cleaned = clean_description("This Image Shows a red car parked on the street", "");
        assert_eq!(cleaned, "Red car parked on the street.");

        let cleaned = clean_description("I can see there are two cups on a table", "");
        assert_eq!(cleaned, "Two cups on a table.");
    }

    #[test]
    fn turns_question_marks_and_colons_into_breaks() {
        let cleaned = clean_description("the sky: blue and clear? maybe", "");
        assert_eq!(cleaned, "Sky. blue and clear. maybe.");
    }

    #[test]
    fn collapses_periods_and_whitespace() {
        let cleaned = clean_description("sunny   day...   at the   park", "");
        assert_eq!(cleaned, "Sunny day. at the park.");
    }

    #[test]
    fn collapses_spaced_period_runs() {
        assert_eq!(clean_description("sky? ? blue", ""), "Sky. blue.");
        assert_eq!(clean_description("calm lake.. . at dawn", ""), "Calm lake. at dawn.");
    }

    #[test]
    fn prompt_recreated_by_capitalization_is_removed() {
        let cleaned = clean_description("sunset over water", "Sunset over water");
        assert_eq!(cleaned, "");

        let cleaned = clean_description("red barn in a field", "Red barn");
        assert!(!cleaned.contains("Red barn"), "{cleaned:?}");
        assert_eq!(cleaned, "In a field.");
    }

    #[test]
    fn prompt_recreated_by_closing_period_is_removed() {
        let cleaned = clean_description("dog on grass", "grass.");
        assert!(!cleaned.contains("grass."), "{cleaned:?}");
    }

    #[test]
    fn keeps_article_before_proper_noun() {
        assert_eq!(
            clean_description("The Eiffel Tower at night", ""),
            "The Eiffel Tower at night."
        );
    }

    #[test]
    fn strips_punctuation_left_by_removals() {
        let cleaned = clean_description("this image shows: a quiet street", "");
        assert_eq!(cleaned, "Quiet street.");
    }

    #[test]
    fn keeps_existing_terminal_punctuation() {
        assert_eq!(clean_description("what a lovely view!", ""), "What a lovely view!");
    }

    #[test]
    fn empty_when_only_prompt_or_noise() {
        let prompt = Aspect::Mood.prompt();
        assert_eq!(clean_description("", prompt), "");
        assert_eq!(clean_description(prompt, prompt), "");
        assert_eq!(clean_description("what is happening?", ""), "");
    }

    #[test]
    fn never_leaves_the_prompt_behind() {
        let prompt = Aspect::Unconditional.prompt();
        let samples = [
            "a photoa photograph ofgraph of a cat",
            "a photograph of a photograph of a city skyline",
            "a photograph  of dogs",
            "a photograph of",
        ];
        for sample in samples {
            let cleaned = clean_description(sample, prompt);
            assert!(!cleaned.contains(prompt), "{sample:?} -> {cleaned:?}");
        }
    }

    #[test]
    fn non_empty_output_ends_with_terminal_punctuation() {
        let samples = [
            "a bowl of fruit",
            "is this a cat? yes",
            "Question: What objects can you see? Answer: a lamp: a chair",
            "bright colors!",
            "people walking...",
        ];
        for sample in samples {
            let cleaned = clean_description(sample, Aspect::Objects.prompt());
            if !cleaned.is_empty() {
                assert!(ends_with_terminal(&cleaned), "{sample:?} -> {cleaned:?}");
            }
        }
    }

    #[test]
    fn capitalize_handles_multibyte_first_char() {
        assert_eq!(capitalize_first("éclair on a plate"), "Éclair on a plate");
        assert_eq!(capitalize_first(""), "");
    }
}
