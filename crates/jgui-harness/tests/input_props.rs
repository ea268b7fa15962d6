#![forbid(unsafe_code)]

//! Property tests: user input validation and unit-state mapping.

use jgui_harness::simulate::submit_value;
use jgui_harness::strategies::{agent_state, float_text, int_text, non_numeric_text, unit_count_input};
use jgui_harness::{page_shell, sample};
use jgui_runtime::Model;
use jgui_widgets::env::Settings;
use jgui_widgets::service::config::{OptionKind, OptionSchema, Schema, validate};
use jgui_widgets::service::{ServicePage, compose_page};
use jgui_widgets::utils::{UnitState, simplify_state};
use proptest::prelude::*;

fn schema(kind: OptionKind) -> Schema {
    let mut schema = Schema::default();
    schema.insert(
        "opt".to_string(),
        OptionSchema {
            kind,
            default: None,
            description: String::new(),
        },
    );
    schema
}

fn one(value: &str) -> Settings {
    Settings::from([("opt".to_string(), value.to_string())])
}

proptest! {
    #[test]
    fn integers_validate_as_int_and_float(text in int_text()) {
        prop_assert!(validate(&one(&text), &schema(OptionKind::Int)).is_empty());
        prop_assert!(validate(&one(&text), &schema(OptionKind::Float)).is_empty());
    }

    #[test]
    fn decimals_are_floats_but_not_ints(text in float_text()) {
        prop_assert!(validate(&one(&text), &schema(OptionKind::Float)).is_empty());
        let errors = validate(&one(&text), &schema(OptionKind::Int));
        prop_assert_eq!(
            errors.get("opt").cloned(),
            Some(format!("The value \"{text}\" is not an integer."))
        );
    }

    #[test]
    fn strings_accept_anything(text in non_numeric_text()) {
        prop_assert!(validate(&one(&text), &schema(OptionKind::String)).is_empty());
        prop_assert!(!validate(&one(&text), &schema(OptionKind::Int)).is_empty());
    }

    #[test]
    fn unit_state_mapping(state in agent_state()) {
        let unit = Model::new("u/0").with("agent_state", state.as_str());
        let expected = if state == "started" {
            UnitState::Running
        } else if state.ends_with("error") {
            UnitState::Error
        } else {
            UnitState::Pending
        };
        prop_assert_eq!(simplify_state(&unit), expected);
    }

    #[test]
    fn unit_field_calls_only_for_real_changes(input in unit_count_input()) {
        let fx = sample();
        let (_body, content) = page_shell(40, 20);
        let mut page = compose_page(ServicePage::Units, &fx.context(&fx.mysql), &content).unwrap();
        page.render().unwrap();
        let field = content.query("#num-service-units").unwrap();
        submit_value(&field, &input);

        let trimmed = input.trim();
        let requested = trimmed
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| trimmed.parse::<i64>().ok())
            .flatten();
        let expect_call = matches!(requested, Some(n) if n >= 1 && n != 2);
        prop_assert_eq!(fx.env.calls().len(), usize::from(expect_call));
        let expected_count = if expect_call { requested.unwrap_or(2) } else { 2 };
        prop_assert_eq!(fx.mysql.get_i64("unit_count"), Some(expected_count));
        prop_assert_eq!(field.value(), expected_count.to_string());
        prop_assert!(!field.is_disabled());
    }
}
