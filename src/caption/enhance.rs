use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextCategory {
    Subject,
    Object,
    Location,
    Activity,
    Atmosphere,
}

struct KeywordContext {
    category: ContextCategory,
    keyword: &'static str,
    sentence: &'static str,
}

const fn context(
    category: ContextCategory,
    keyword: &'static str,
    sentence: &'static str,
) -> KeywordContext {
    KeywordContext {
        category,
        keyword,
        sentence,
    }
}

/// Checked top to bottom; the first keyword found in the caption wins, so
/// table order is the tie-break between overlapping keywords.
const KEYWORD_CONTEXTS: &[KeywordContext] = &[
    context(ContextCategory::Subject, "person", "A person is the main subject, captured in what appears to be a candid or posed photograph."),
    context(ContextCategory::Subject, "people", "Multiple people are visible, suggesting a social gathering or group activity."),
    context(ContextCategory::Subject, "man", "A man is prominently featured in the scene."),
    context(ContextCategory::Subject, "woman", "A woman is the central figure in this image."),
    context(ContextCategory::Subject, "child", "A child can be seen, adding a youthful element to the composition."),
    context(ContextCategory::Subject, "children", "Children are present, bringing energy and life to the scene."),
    context(ContextCategory::Subject, "baby", "A baby is visible, creating a tender moment."),
    context(ContextCategory::Object, "dog", "A dog is present, likely a pet or companion animal."),
    context(ContextCategory::Object, "cat", "A cat can be seen, adding a feline presence to the image."),
    context(ContextCategory::Object, "bird", "A bird appears in the frame, possibly in flight or perched."),
    context(ContextCategory::Object, "car", "A car is visible, suggesting transportation or urban context."),
    context(ContextCategory::Object, "bicycle", "A bicycle is present, indicating cycling or outdoor activity."),
    context(ContextCategory::Object, "food", "Food items are displayed, possibly in a dining or culinary context."),
    context(ContextCategory::Object, "book", "A book is visible, suggesting reading or educational content."),
    context(ContextCategory::Object, "phone", "A phone appears, indicating modern communication or technology."),
    context(ContextCategory::Object, "computer", "A computer is present, suggesting work or digital activity."),
    context(ContextCategory::Location, "beach", "The setting appears to be at a beach, with sand and possibly water visible."),
    context(ContextCategory::Location, "mountain", "Mountains can be seen in the background, suggesting a natural outdoor environment."),
    context(ContextCategory::Location, "building", "A building is visible, indicating an urban or developed area."),
    context(ContextCategory::Location, "park", "The scene takes place in a park, suggesting outdoor recreation."),
    context(ContextCategory::Location, "street", "This appears to be on a street, in an urban or suburban setting."),
    context(ContextCategory::Location, "room", "The scene is set indoors in a room."),
    context(ContextCategory::Location, "kitchen", "This takes place in a kitchen, suggesting cooking or dining activities."),
    context(ContextCategory::Location, "office", "An office setting is evident, indicating a work environment."),
    context(ContextCategory::Activity, "sitting", "The subject is in a seated position, appearing relaxed or resting."),
    context(ContextCategory::Activity, "standing", "The subject is standing, suggesting an active or formal pose."),
    context(ContextCategory::Activity, "walking", "Movement is captured, with someone walking through the scene."),
    context(ContextCategory::Activity, "running", "Dynamic action is shown with someone running."),
    context(ContextCategory::Activity, "playing", "Play or recreational activity is taking place."),
    context(ContextCategory::Activity, "eating", "Dining or eating activity is captured in the moment."),
    context(ContextCategory::Activity, "working", "Work-related activity is taking place."),
    context(ContextCategory::Activity, "reading", "Someone is engaged in reading."),
    context(ContextCategory::Activity, "smiling", "A smile is visible, suggesting happiness or positive emotion."),
    context(ContextCategory::Atmosphere, "sunny", "The lighting suggests sunny or bright conditions."),
    context(ContextCategory::Atmosphere, "cloudy", "Overcast or cloudy conditions are apparent."),
    context(ContextCategory::Atmosphere, "snow", "Snow is present, indicating winter conditions."),
    context(ContextCategory::Atmosphere, "rain", "Rain or wet conditions are visible."),
    context(ContextCategory::Atmosphere, "night", "This appears to be taken at night or in low-light conditions."),
    context(ContextCategory::Atmosphere, "sunset", "The warm lighting suggests sunset or golden hour."),
];

const GENERIC_CONTEXT: &str = "The composition captures various elements that tell a visual story.";

const CLOSINGS: [&str; 4] = [
    "The image has a clear focal point and balanced composition.",
    "Various elements in the frame contribute to the overall narrative.",
    "The scene appears naturally composed with attention to detail.",
    "The photograph captures a moment in time with visual clarity.",
];

/// First keyword (case-insensitive substring) found in the caption.
pub fn match_context(caption: &str) -> Option<(ContextCategory, &'static str)> {
    let lowered = caption.to_lowercase();
    KEYWORD_CONTEXTS
        .iter()
        .find(|entry| lowered.contains(entry.keyword))
        .map(|entry| (entry.category, entry.sentence))
}

/// Expands a short caption into a three-sentence paragraph. Deterministic:
/// the closing sentence is picked by caption length.
pub fn enhance_caption(caption: &str) -> String {
    let caption = caption.trim();
    let context = match match_context(caption) {
        Some((category, sentence)) => {
            debug!("Enhancing caption with {:?} context", category);
            sentence
        }
        None => GENERIC_CONTEXT,
    };
    let closing = CLOSINGS[caption.chars().count() % CLOSINGS.len()];
    format!(
        "This image shows {}. {} {}",
        caption.trim_end_matches('.'),
        context,
        closing
    )
}
