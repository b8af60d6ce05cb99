//! Best-effort decoding of a generated test plan
//!
//! The model is asked for blocks separated by `---`, each made of
//! `Field: value` lines. Anything missing gets a per-field default; blocks
//! without a single recognised field are dropped.

use crate::model::{Category, Priority, TestSpecification};

const DEFAULT_STEPS: &[&str] = &["Navigate to the application", "Perform test action", "Verify result"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Name,
    Description,
    Kind,
    Priority,
    Steps,
    Expected,
    Validation,
}

impl Field {
    fn parse(key: &str) -> Option<Self> {
        match key.trim().trim_matches('*').trim().to_lowercase().as_str() {
            "name" | "title" => Some(Field::Name),
            "description" => Some(Field::Description),
            "type" | "category" => Some(Field::Kind),
            "priority" => Some(Field::Priority),
            "steps" => Some(Field::Steps),
            "expected" | "expected outcome" => Some(Field::Expected),
            "validation" | "validation criteria" => Some(Field::Validation),
            _ => None,
        }
    }
}

/// Strip list markers: "- ", "* ", "1. ", "2) "
fn strip_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim_start();
        }
    }
    line
}

fn split_list(value: &str, sep: char) -> Vec<String> {
    value
        .split(sep)
        .map(|s| s.trim().trim_matches(['[', ']']).trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[derive(Default)]
struct Draft {
    name: Option<String>,
    description: Option<String>,
    category: Option<Category>,
    priority: Option<Priority>,
    steps: Vec<String>,
    expected: Option<String>,
    validation: Vec<String>,
    recognised: bool,
}

impl Draft {
    fn into_spec(self, id: String) -> TestSpecification {
        let steps = if self.steps.is_empty() {
            DEFAULT_STEPS.iter().map(|s| s.to_string()).collect()
        } else {
            self.steps
        };
        let validation = if self.validation.is_empty() {
            vec!["Check result matches expected outcome".to_string()]
        } else {
            self.validation
        };

        TestSpecification::new(
            &id,
            self.name.as_deref().unwrap_or("Test Case"),
            self.category.unwrap_or(Category::Interaction),
            self.priority.unwrap_or(Priority::Medium),
        )
        .with_description(self.description.as_deref().unwrap_or("Generated test case"))
        .with_steps(steps)
        .with_expected(self.expected.as_deref().unwrap_or("Test passes successfully"))
        .with_criteria(validation)
    }
}

fn decode_block(block: &str) -> Option<Draft> {
    let mut draft = Draft::default();
    // Field whose value may continue on the following list lines
    let mut open: Option<Field> = None;

    for raw in block.lines() {
        let line = strip_marker(raw);
        if line.is_empty() {
            continue;
        }

        let field = line
            .split_once(':')
            .and_then(|(key, value)| Field::parse(key).map(|f| (f, value.trim())));

        let Some((field, value)) = field else {
            // Continuation of a list field
            match open {
                Some(Field::Steps) => draft.steps.push(line.to_string()),
                Some(Field::Validation) => draft.validation.push(line.to_string()),
                _ => {}
            }
            continue;
        };

        draft.recognised = true;
        open = Some(field);
        let value = value.trim_matches('*').trim();
        match field {
            Field::Name => draft.name = Some(value.to_string()).filter(|v| !v.is_empty()),
            Field::Description => {
                draft.description = Some(value.to_string()).filter(|v| !v.is_empty())
            }
            Field::Kind => draft.category = Category::parse(value),
            Field::Priority => draft.priority = Priority::parse(value),
            Field::Steps => draft.steps.extend(split_list(value, ',')),
            Field::Expected => draft.expected = Some(value.to_string()).filter(|v| !v.is_empty()),
            Field::Validation => draft.validation.extend(split_list(value, ';')),
        }
    }

    draft.recognised.then_some(draft)
}

/// Decode at most `count` specifications with ids `test_001…`
pub fn decode_cases(reply: &str, count: usize) -> Vec<TestSpecification> {
    reply
        .split("---")
        .filter_map(decode_block)
        .take(count)
        .enumerate()
        .map(|(i, draft)| draft.into_spec(format!("test_{:03}", i + 1)))
        .collect()
}
