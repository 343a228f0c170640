//! Question content consumed by the round engine.
//!
//! Quiz content lives outside the session core. Rooms only see it through
//! [`QuestionProvider`]; [`StaticQuestionBank`] is an in-memory provider
//! that ships with a small built-in catalogue.

use std::collections::{BTreeMap, HashMap};

/// One question as supplied by the content source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub prompt: String,
    /// Option text keyed by label.
    pub options: BTreeMap<String, String>,
    pub correct_label: String,
}

impl QuizQuestion {
    /// Builds a question whose options are labelled `A`, `B`, `C`, ...
    pub fn lettered<I, S>(prompt: impl Into<String>, options: I, correct_label: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options = options
            .into_iter()
            .zip(b'A'..=b'Z')
            .map(|(text, label)| (char::from(label).to_string(), text.into()))
            .collect();
        Self {
            prompt: prompt.into(),
            options,
            correct_label: correct_label.to_owned(),
        }
    }
}

/// Source of question pools.
///
/// Called from inside room actors, so implementations must answer without
/// blocking. Pools are indexed round-robin by round number, so a provider
/// must return them in a stable order.
pub trait QuestionProvider: Send + Sync + 'static {
    /// The pool for `category`, or `None` if the category is unknown.
    fn questions_for_category(&self, category: &str) -> Option<Vec<QuizQuestion>>;

    /// Fallback pool used when a room has no usable category.
    fn default_questions(&self) -> Vec<QuizQuestion>;
}

/// An in-memory [`QuestionProvider`].
#[derive(Debug, Clone, Default)]
pub struct StaticQuestionBank {
    categories: HashMap<String, Vec<QuizQuestion>>,
    default_pool: Vec<QuizQuestion>,
}

impl StaticQuestionBank {
    /// An empty bank that serves `default_pool` for every category.
    pub fn new(default_pool: Vec<QuizQuestion>) -> Self {
        Self {
            categories: HashMap::new(),
            default_pool,
        }
    }

    /// Adds or replaces a category pool.
    pub fn with_category(mut self, category: impl Into<String>, pool: Vec<QuizQuestion>) -> Self {
        self.categories.insert(category.into(), pool);
        self
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// The catalogue the demo server runs with: music categories plus a
    /// general-knowledge default pool.
    pub fn builtin() -> Self {
        fn q(prompt: &str, options: [&str; 4], correct_label: &str) -> QuizQuestion {
            QuizQuestion::lettered(prompt, options, correct_label)
        }

        Self::new(vec![
            q("What is the capital of France?", ["London", "Berlin", "Paris", "Madrid"], "C"),
            q(
                "Who painted the Mona Lisa?",
                ["Vincent van Gogh", "Leonardo da Vinci", "Pablo Picasso", "Michelangelo"],
                "B",
            ),
            q("Which planet is known as the Red Planet?", ["Venus", "Jupiter", "Mars", "Saturn"], "C"),
        ])
        .with_category(
            "rock-70",
            vec![
                q(
                    "Which band released the album \"Dark Side of the Moon\" in 1973?",
                    ["Pink Floyd", "Led Zeppelin", "The Rolling Stones", "The Who"],
                    "A",
                ),
                q(
                    "Who was the lead vocalist of Queen in the 1970s?",
                    ["Roger Taylor", "Freddie Mercury", "Brian May", "John Deacon"],
                    "B",
                ),
            ],
        )
        .with_category(
            "rock-80",
            vec![
                q(
                    "Which band released the hit song \"Sweet Child O' Mine\"?",
                    ["Metallica", "Guns N' Roses", "AC/DC", "Def Leppard"],
                    "B",
                ),
                q(
                    "Which 80s rock band featured Axl Rose as the lead vocalist?",
                    ["Mötley Crüe", "Bon Jovi", "Guns N' Roses", "Aerosmith"],
                    "C",
                ),
            ],
        )
        .with_category(
            "funk",
            vec![
                q(
                    "Who is known as the \"Godfather of Funk\"?",
                    ["James Brown", "George Clinton", "Bootsy Collins", "Sly Stone"],
                    "A",
                ),
                q(
                    "Which funk band is known for the hit \"Flashlight\"?",
                    ["Earth, Wind & Fire", "Parliament", "Kool & the Gang", "The Brothers Johnson"],
                    "B",
                ),
            ],
        )
        .with_category(
            "rap",
            vec![
                q(
                    "Which rapper released the album \"The Chronic\" in 1992?",
                    ["Snoop Dogg", "Dr. Dre", "Ice Cube", "Tupac Shakur"],
                    "B",
                ),
                q(
                    "Which rap group released the album \"Straight Outta Compton\"?",
                    ["Public Enemy", "Wu-Tang Clan", "N.W.A", "A Tribe Called Quest"],
                    "C",
                ),
            ],
        )
        .with_category(
            "latin",
            vec![
                q(
                    "Which artist is known as the \"Queen of Salsa\"?",
                    ["Gloria Estefan", "Shakira", "Celia Cruz", "Jennifer Lopez"],
                    "C",
                ),
                q(
                    "Which Latin music genre originated in Argentina?",
                    ["Salsa", "Tango", "Samba", "Reggaeton"],
                    "B",
                ),
            ],
        )
    }
}

impl QuestionProvider for StaticQuestionBank {
    fn questions_for_category(&self, category: &str) -> Option<Vec<QuizQuestion>> {
        self.categories.get(category).cloned()
    }

    fn default_questions(&self) -> Vec<QuizQuestion> {
        self.default_pool.clone()
    }
}
