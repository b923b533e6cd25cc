use std::collections::HashMap;
use std::fmt;

/// Entries at or below this many characters carry no usable description.
pub const MIN_ASPECT_CHARS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aspect {
    Unconditional,
    Subject,
    Action,
    Setting,
    Background,
    Atmosphere,
    Objects,
    Composition,
    Mood,
    People,
}

impl Aspect {
    /// Prompt order used when querying the captioning model.
    pub const ALL: [Aspect; 10] = [
        Aspect::Unconditional,
        Aspect::Subject,
        Aspect::Action,
        Aspect::Setting,
        Aspect::Background,
        Aspect::Atmosphere,
        Aspect::Objects,
        Aspect::Composition,
        Aspect::Mood,
        Aspect::People,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Aspect::Unconditional => "unconditional",
            Aspect::Subject => "subject",
            Aspect::Action => "action",
            Aspect::Setting => "setting",
            Aspect::Background => "background",
            Aspect::Atmosphere => "atmosphere",
            Aspect::Objects => "objects",
            Aspect::Composition => "composition",
            Aspect::Mood => "mood",
            Aspect::People => "people",
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Aspect::Unconditional => "a photograph of",
            Aspect::Subject => "Question: What is the main subject of this image? Answer:",
            Aspect::Action => "Question: What is happening in this image? Answer:",
            Aspect::Setting => "Question: Describe the setting and location. Answer:",
            Aspect::Background => "Question: What is in the background? Answer:",
            Aspect::Atmosphere => {
                "Question: Describe the colors, lighting and atmosphere. Answer:"
            }
            Aspect::Objects => "Question: What objects can you see? Answer:",
            Aspect::Composition => "Question: Describe the composition and framing. Answer:",
            Aspect::Mood => "Question: What is the mood or feeling of this image? Answer:",
            Aspect::People => "Question: Are there any people? What are they doing? Answer:",
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized description per aspect. Short or empty text never gets in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AspectMap {
    entries: HashMap<Aspect, String>,
}

impl AspectMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the text was rejected.
    pub fn insert(&mut self, aspect: Aspect, text: impl Into<String>) -> bool {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.chars().count() < MIN_ASPECT_CHARS {
            return false;
        }
        self.entries.insert(aspect, trimmed.to_string());
        true
    }

    pub fn get(&self, aspect: Aspect) -> Option<&str> {
        self.entries.get(&aspect).map(|value| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in prompt order.
    pub fn iter(&self) -> impl Iterator<Item = (Aspect, &str)> {
        Aspect::ALL
            .iter()
            .filter_map(move |aspect| self.get(*aspect).map(|text| (*aspect, text)))
    }
}

impl<S: Into<String>> FromIterator<(Aspect, S)> for AspectMap {
    fn from_iter<I: IntoIterator<Item = (Aspect, S)>>(iter: I) -> Self {
        let mut map = AspectMap::new();
        for (aspect, text) in iter {
            map.insert(aspect, text);
        }
        map
    }
}
