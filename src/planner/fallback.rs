use crate::model::{Category, Priority, TestSpecification};

/// Generic web application checks used when no plan can be generated
fn catalog() -> Vec<TestSpecification> {
    vec![
        TestSpecification::new(
            "",
            "Landing Page Load Test",
            Category::Interaction,
            Priority::High,
        )
        .with_description("Verify the entry page loads and renders its main content")
        .with_steps([
            "Navigate to the application",
            "Wait for page to load",
            "Verify title is shown",
            "Verify no error messages are displayed",
        ])
        .with_expected("Page loads with visible content and no errors")
        .with_criteria(["Page loads", "Title visible", "No error messages"]),
        TestSpecification::new(
            "",
            "Primary Interaction Test",
            Category::Interaction,
            Priority::High,
        )
        .with_description("Exercise the first interactive control on the page")
        .with_steps([
            "Navigate to the application",
            "Wait for page to load",
            "Click the main button",
            "Wait 1 second",
            "Verify the page responds",
        ])
        .with_expected("The page reacts to the interaction")
        .with_criteria(["Clicks register", "Visual feedback works"]),
        TestSpecification::new(
            "",
            "State Update Test",
            Category::Mechanics,
            Priority::Medium,
        )
        .with_description("Perform an action and check that visible state changes")
        .with_steps([
            "Navigate to the application",
            "Click on a cell",
            "Check for visual feedback",
            "Verify score is displayed",
        ])
        .with_expected("Visible state reflects the action")
        .with_criteria(["State changes after interaction"]),
        TestSpecification::new(
            "",
            "Load Responsiveness Test",
            Category::Performance,
            Priority::Medium,
        )
        .with_description("Check that the page becomes usable within a short time")
        .with_steps(["Navigate to the application", "Wait for page to load", "Verify board is visible"])
        .with_expected("Page is interactive shortly after navigation")
        .with_criteria(["Interactive elements present"]),
        TestSpecification::new(
            "",
            "Invalid Input Test",
            Category::ErrorHandling,
            Priority::Low,
        )
        .with_description("Submit unexpected input and check the page stays usable")
        .with_steps([
            "Navigate to the application",
            "Type \"%%invalid%%\" into the first input",
            "Press the submit button",
            "Verify no crash occurred",
        ])
        .with_expected("Invalid input is handled gracefully")
        .with_criteria(["No unhandled error", "Page still responsive"]),
    ]
}

/// The catalog cycled to exactly `count` entries, ids `fallback_001…`
pub fn fallback_cases(count: usize) -> Vec<TestSpecification> {
    let base = catalog();
    base.iter()
        .cycle()
        .take(count)
        .enumerate()
        .map(|(i, template)| {
            let mut spec = template.clone();
            spec.id = format!("fallback_{:03}", i + 1);
            if i >= base.len() {
                spec.name = format!("{} #{}", template.name, i / base.len() + 1);
            }
            spec
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_cycles_to_count_with_unique_ids() {
        let specs = fallback_cases(12);
        assert_eq!(specs.len(), 12);
        assert_eq!(specs[0].id, "fallback_001");
        assert_eq!(specs[11].id, "fallback_012");

        let ids: HashSet<_> = specs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), 12);
        assert_eq!(specs[5].name, "Landing Page Load Test #2");
    }

    #[test]
    fn test_deterministic_and_empty_for_zero() {
        assert_eq!(fallback_cases(3), fallback_cases(3));
        assert!(fallback_cases(0).is_empty());
    }
}
