use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named chat personality that selects the response style of the chat service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Action and consequence.
    #[default]
    Karma,
    /// Purpose and righteous duty.
    Dharma,
    /// Mindfulness and the inner self.
    Atma,
}

impl Persona {
    /// All personas, in menu order.
    pub const ALL: [Persona; 3] = [Persona::Karma, Persona::Dharma, Persona::Atma];

    /// Wire name sent to the chat service.
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Karma => "karma",
            Persona::Dharma => "dharma",
            Persona::Atma => "atma",
        }
    }

    /// Capitalized name shown to the user.
    pub fn display_name(&self) -> &'static str {
        match self {
            Persona::Karma => "Karma",
            Persona::Dharma => "Dharma",
            Persona::Atma => "Atma",
        }
    }

    /// Greeting that opens every new transcript.
    pub fn welcome_message(&self) -> String {
        format!(
            "Welcome to KarmaCafe. I'm {}, how can I help you on your spiritual journey today?",
            self.display_name()
        )
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "karma" => Ok(Persona::Karma),
            "dharma" => Ok(Persona::Dharma),
            "atma" => Ok(Persona::Atma),
            _ => Err(format!("Unknown persona: {}", s)),
        }
    }
}
