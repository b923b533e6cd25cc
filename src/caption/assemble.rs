use tracing::debug;

use crate::caption::aspect::{Aspect, AspectMap};
use crate::caption::enhance::enhance_caption;
use crate::caption::polish::polish;

pub const MAX_FRAGMENTS: usize = 6;

const ACTION_MIN_CHARS: usize = 15;
const PEOPLE_MIN_CHARS: usize = 20;
const OBJECTS_MIN_CHARS: usize = 15;
const PLACE_MIN_CHARS: usize = 15;
const ATMOSPHERE_MIN_CHARS: usize = 20;
const COMPOSITION_MIN_CHARS: usize = 25;
const MOOD_MIN_CHARS: usize = 15;

const QUANTIFIER_WORDS: [&str; 4] = ["various", "several", "multiple", "include"];
const NEGATION_WORDS: [&str; 2] = ["no", "not"];

/// Sentence fragments in rule order, at most [`MAX_FRAGMENTS`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledDescription {
    fragments: Vec<String>,
}

impl AssembledDescription {
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Joins fragments as sentences. Four or more fragments get an
    /// "Additionally," lead-in on the last one.
    pub fn to_paragraph(&self) -> String {
        let sentences: Vec<&str> = self
            .fragments
            .iter()
            .map(|fragment| fragment.trim().trim_end_matches(['.', '!', '?']))
            .filter(|fragment| !fragment.is_empty())
            .collect();

        match sentences.split_last() {
            None => String::new(),
            Some((last, head)) if head.len() >= 3 => format!(
                "{}. Additionally, {}.",
                head.join(". "),
                lowercase_first(last)
            ),
            Some(_) => format!("{}.", sentences.join(". ")),
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn has_negation(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| NEGATION_WORDS.contains(&word))
}

struct FragmentList {
    fragments: Vec<String>,
}

impl FragmentList {
    /// True when `candidate` already appears inside an accepted fragment.
    fn mentions(&self, candidate: &str) -> bool {
        let needle = candidate
            .trim()
            .trim_end_matches(['.', '!', '?'])
            .to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.fragments
            .iter()
            .any(|fragment| fragment.to_lowercase().contains(&needle))
    }

    /// Appends `render(text)` when the candidate passes the length gate and
    /// is not already covered. Returns whether it was appended.
    fn offer(&mut self, text: &str, min_chars: usize, render: impl FnOnce(&str) -> String) -> bool {
        if char_len(text) <= min_chars || self.mentions(text) {
            return false;
        }
        self.fragments.push(render(text));
        true
    }
}

/// Builds the ordered fragment list for a detailed description.
pub fn assemble(aspects: &AspectMap, base_caption: &str) -> AssembledDescription {
    let mut list = FragmentList {
        fragments: Vec::new(),
    };

    let unconditional_opening = match aspects.get(Aspect::Unconditional) {
        Some(opening) => {
            list.fragments
                .push(format!("This photograph shows {}", lowercase_first(opening)));
            true
        }
        None => {
            if let Some(subject) = aspects.get(Aspect::Subject) {
                list.fragments.push(format!(
                    "The main focus of this image is {}",
                    lowercase_first(subject)
                ));
            } else if !base_caption.trim().is_empty() {
                list.fragments
                    .push(format!("This image depicts {}", base_caption.trim()));
            }
            false
        }
    };

    // Action only follows an unconditional opening.
    if unconditional_opening {
        if let Some(action) = aspects.get(Aspect::Action) {
            list.offer(action, ACTION_MIN_CHARS, str::to_string);
        }
    }

    if let Some(people) = aspects.get(Aspect::People) {
        if !has_negation(people) {
            list.offer(people, PEOPLE_MIN_CHARS, str::to_string);
        }
    }

    if let Some(objects) = aspects.get(Aspect::Objects) {
        list.offer(objects, OBJECTS_MIN_CHARS, |text| {
            let lowered = text.to_lowercase();
            if QUANTIFIER_WORDS.iter().any(|word| lowered.contains(word)) {
                text.to_string()
            } else {
                format!("Visible objects include {}", lowercase_first(text))
            }
        });
    }

    let setting_added = aspects
        .get(Aspect::Setting)
        .map(|setting| {
            list.offer(setting, PLACE_MIN_CHARS, |text| {
                format!("The scene is set in {}", lowercase_first(text))
            })
        })
        .unwrap_or(false);
    if !setting_added {
        if let Some(background) = aspects.get(Aspect::Background) {
            list.offer(background, PLACE_MIN_CHARS, |text| {
                format!("The background features {}", lowercase_first(text))
            });
        }
    }

    if let Some(atmosphere) = aspects.get(Aspect::Atmosphere) {
        list.offer(atmosphere, ATMOSPHERE_MIN_CHARS, str::to_string);
    }

    if let Some(composition) = aspects.get(Aspect::Composition) {
        list.offer(composition, COMPOSITION_MIN_CHARS, str::to_string);
    }

    if let Some(mood) = aspects.get(Aspect::Mood) {
        list.offer(mood, MOOD_MIN_CHARS, |text| {
            format!("The overall mood is {}", lowercase_first(text))
        });
    }

    list.fragments.truncate(MAX_FRAGMENTS);
    AssembledDescription {
        fragments: list.fragments,
    }
}

/// Detailed description for one image: assembled and polished when any
/// aspect survived, keyword-enhanced base caption otherwise.
pub fn build_description(aspects: &AspectMap, base_caption: &str) -> String {
    if aspects.is_empty() {
        return enhance_caption(base_caption);
    }
    let assembled = assemble(aspects, base_caption);
    debug!(
        "Assembled {} fragments from {} aspects",
        assembled.fragments().len(),
        aspects.len()
    );
    let polished = polish(&assembled.to_paragraph());
    if polished.is_empty() {
        enhance_caption(base_caption)
    } else {
        polished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(Aspect, &str)]) -> AspectMap {
        entries.iter().map(|(aspect, text)| (*aspect, *text)).collect()
    }

    #[test]
    fn unconditional_alone_becomes_single_sentence() {
        let aspects = map(&[(Aspect::Unconditional, "a dog running on a beach")]);
        let assembled = assemble(&aspects, "a dog");
        assert_eq!(
            assembled.fragments(),
            ["This photograph shows a dog running on a beach".to_string()]
        );
        assert_eq!(
            build_description(&aspects, "a dog"),
            "This photograph shows a dog running on a beach."
        );
    }

    #[test]
    fn subject_opening_when_unconditional_missing() {
        let aspects = map(&[(Aspect::Subject, "Golden retriever puppy.")]);
        assert_eq!(
            assemble(&aspects, "a dog").fragments()[0],
            "The main focus of this image is golden retriever puppy."
        );
    }

    #[test]
    fn base_caption_opening_when_no_lead_aspect() {
        let aspects = map(&[(Aspect::Mood, "Calm and peaceful evening.")]);
        let assembled = assemble(&aspects, "a lake at dusk");
        assert_eq!(
            assembled.fragments(),
            [
                "This image depicts a lake at dusk".to_string(),
                "The overall mood is calm and peaceful evening.".to_string(),
            ]
        );
    }

    #[test]
    fn skips_action_already_in_opening() {
        let aspects = map(&[
            (Aspect::Unconditional, "Dog running on a sandy beach."),
            (Aspect::Action, "Dog running on a sandy beach."),
        ]);
        assert_eq!(assemble(&aspects, "a dog").fragments().len(), 1);
    }

    #[test]
    fn action_needs_unconditional_opening() {
        let aspects = map(&[
            (Aspect::Subject, "Golden retriever puppy."),
            (Aspect::Action, "Chasing a ball across the lawn."),
        ]);
        assert_eq!(
            assemble(&aspects, "a dog").fragments(),
            ["The main focus of this image is golden retriever puppy.".to_string()]
        );

        let aspects = map(&[(Aspect::Action, "Chasing a ball across the lawn.")]);
        assert_eq!(
            assemble(&aspects, "a dog on grass").fragments(),
            ["This image depicts a dog on grass".to_string()]
        );

        let aspects = map(&[
            (Aspect::Unconditional, "a puppy on a lawn"),
            (Aspect::Action, "Chasing a ball across the lawn."),
        ]);
        assert_eq!(assemble(&aspects, "a dog").fragments().len(), 2);
    }

    #[test]
    fn people_with_negation_is_skipped() {
        let aspects = map(&[
            (Aspect::Unconditional, "a quiet mountain lake"),
            (Aspect::People, "There are no people in this picture."),
        ]);
        assert_eq!(assemble(&aspects, "a lake").fragments().len(), 1);

        let aspects = map(&[
            (Aspect::Unconditional, "a quiet mountain lake"),
            (Aspect::People, "Two hikers knowing the trail well."),
        ]);
        assert_eq!(assemble(&aspects, "a lake").fragments().len(), 2);
    }

    #[test]
    fn objects_phrasing_depends_on_quantifiers() {
        let aspects = map(&[
            (Aspect::Unconditional, "a cluttered desk"),
            (Aspect::Objects, "Laptop, coffee mug and a lamp."),
        ]);
        assert_eq!(
            assemble(&aspects, "a desk").fragments()[1],
            "Visible objects include laptop, coffee mug and a lamp."
        );

        let aspects = map(&[
            (Aspect::Unconditional, "a cluttered desk"),
            (Aspect::Objects, "Several books and a lamp."),
        ]);
        assert_eq!(
            assemble(&aspects, "a desk").fragments()[1],
            "Several books and a lamp."
        );
    }

    #[test]
    fn setting_preferred_over_background() {
        let aspects = map(&[
            (Aspect::Unconditional, "a cafe terrace"),
            (Aspect::Setting, "Busy city square in summer."),
            (Aspect::Background, "Old stone buildings and trees."),
        ]);
        let assembled = assemble(&aspects, "a cafe");
        assert_eq!(assembled.fragments().len(), 2);
        assert_eq!(
            assembled.fragments()[1],
            "The scene is set in busy city square in summer."
        );

        let aspects = map(&[
            (Aspect::Unconditional, "a cafe terrace"),
            (Aspect::Setting, "Outdoors ok."),
            (Aspect::Background, "Old stone buildings and trees."),
        ]);
        assert_eq!(
            assemble(&aspects, "a cafe").fragments()[1],
            "The background features old stone buildings and trees."
        );
    }

    #[test]
    fn length_gates_hold_for_every_rule() {
        let aspects = map(&[
            (Aspect::Unconditional, "a garden path"),
            (Aspect::Action, "Leaves fall."),
            (Aspect::People, "A gardener works."),
            (Aspect::Objects, "Rake, hose."),
            (Aspect::Setting, "Back yard."),
            (Aspect::Background, "Tall hedges."),
            (Aspect::Atmosphere, "Soft green light."),
            (Aspect::Composition, "Centered path framing."),
            (Aspect::Mood, "Calm, still."),
        ]);
        assert_eq!(assemble(&aspects, "a garden").fragments().len(), 1);
    }

    fn text_of_len(len: usize) -> String {
        let text: String = "Lanterns illuminating cobblestone alleyways softly"
            .chars()
            .take(len)
            .collect();
        assert_eq!(text.trim().chars().count(), len);
        text
    }

    #[test]
    fn length_gates_reject_at_threshold_and_accept_one_above() {
        let gates = [
            (Aspect::Action, 15),
            (Aspect::People, 20),
            (Aspect::Objects, 15),
            (Aspect::Setting, 15),
            (Aspect::Background, 15),
            (Aspect::Atmosphere, 20),
            (Aspect::Composition, 25),
            (Aspect::Mood, 15),
        ];
        for (aspect, threshold) in gates {
            let at_threshold = text_of_len(threshold);
            let aspects = map(&[
                (Aspect::Unconditional, "a quiet street"),
                (aspect, at_threshold.as_str()),
            ]);
            assert_eq!(
                assemble(&aspects, "a street").fragments().len(),
                1,
                "{aspect} accepted {at_threshold:?}"
            );

            let above = text_of_len(threshold + 1);
            let aspects = map(&[
                (Aspect::Unconditional, "a quiet street"),
                (aspect, above.as_str()),
            ]);
            assert_eq!(
                assemble(&aspects, "a street").fragments().len(),
                2,
                "{aspect} rejected {above:?}"
            );
        }
    }

    #[test]
    fn caps_at_six_fragments_in_rule_order() {
        let aspects = map(&[
            (Aspect::Unconditional, "a crowded street market"),
            (Aspect::Action, "Vendors are selling fresh produce to shoppers."),
            (Aspect::People, "Shoppers browse stalls with baskets in hand."),
            (Aspect::Objects, "Crates of apples, oranges and melons."),
            (Aspect::Setting, "Open air market in an old town."),
            (Aspect::Atmosphere, "Warm morning light with bright colors."),
            (Aspect::Composition, "Wide angle shot with a deep perspective."),
            (Aspect::Mood, "Lively and cheerful atmosphere."),
        ]);
        let assembled = assemble(&aspects, "a market");
        assert_eq!(assembled.fragments().len(), MAX_FRAGMENTS);
        assert!(assembled.fragments()[5].starts_with("Warm morning light"));
        assert!(!assembled
            .fragments()
            .iter()
            .any(|fragment| fragment.starts_with("The overall mood")));
    }

    #[test]
    fn long_paragraph_uses_additionally() {
        let aspects = map(&[
            (Aspect::Unconditional, "a crowded street market"),
            (Aspect::Action, "Vendors are selling fresh produce to shoppers."),
            (Aspect::Objects, "Crates of apples, oranges and melons."),
            (Aspect::Mood, "Lively and cheerful atmosphere."),
        ]);
        let description = build_description(&aspects, "a market");
        assert_eq!(
            description,
            "This photograph shows a crowded street market. \
             Vendors are selling fresh produce to shoppers. \
             Visible objects include crates of apples, oranges and melons. \
             Additionally, the overall mood is lively and cheerful atmosphere."
        );
    }

    #[test]
    fn empty_map_uses_enhancer() {
        let description = build_description(&AspectMap::new(), "a man sitting at a desk with a laptop");
        assert!(description.starts_with("This image shows a man sitting at a desk with a laptop."));
        assert!(description.contains("A man is prominently featured in the scene."));
    }
}
