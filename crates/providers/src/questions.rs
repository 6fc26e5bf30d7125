use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    UseCase,
    Quantity,
    Specification,
    Material,
    Lifecycle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarificationQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub required: bool,
}

impl ClarificationQuestion {
    fn new(id: &str, question: impl Into<String>, kind: QuestionKind, required: bool) -> Self {
        Self {
            id: id.to_string(),
            question: question.into(),
            kind,
            options: None,
            required,
        }
    }

    fn with_options(mut self, options: &[&str]) -> Self {
        self.options = Some(options.iter().map(|o| o.to_string()).collect());
        self
    }
}

/// Clarifying questions for an item.
///
/// Deterministic: three base questions, plus a material question for
/// clothing and a lifecycle question for electronics.
pub fn generate_questions(item_name: &str) -> Vec<ClarificationQuestion> {
    let item = item_name.to_lowercase();

    let mut questions = vec![
        ClarificationQuestion::new(
            "use_case",
            format!("What is the intended use case for this {item_name}?"),
            QuestionKind::UseCase,
            true,
        )
        .with_options(&["Personal use", "Commercial use", "Industrial use", "Export/Wholesale"]),
        ClarificationQuestion::new(
            "quantity",
            "What quantity are you analyzing?",
            QuestionKind::Quantity,
            true,
        ),
        ClarificationQuestion::new(
            "quality",
            "Do you have specific quality or material requirements?",
            QuestionKind::Specification,
            false,
        ),
    ];

    if item.contains("clothing") || item.contains("shirt") {
        questions.push(
            ClarificationQuestion::new(
                "material_preference",
                "Do you have a preference for material type?",
                QuestionKind::Material,
                false,
            )
            .with_options(&["Organic cotton", "Conventional cotton", "Polyester blend", "No preference"]),
        );
    }

    if item.contains("electronic") || item.contains("phone") {
        questions.push(
            ClarificationQuestion::new(
                "lifecycle",
                "How long do you typically use this type of product?",
                QuestionKind::Lifecycle,
                false,
            )
            .with_options(&["1-2 years", "3-5 years", "5+ years"]),
        );
    }

    questions
}
