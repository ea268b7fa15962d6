#![forbid(unsafe_code)]

//! Reference store: a two-service deployment.
//!
//! | Service | Units | Notes |
//! |---------|-------|-------|
//! | `wordpress` | `wordpress/0` started | exposed |
//! | `mysql` | `mysql/0` started, `mysql/1` pending | charm with int/float/bool/string options |
//!
//! Relations: `relation-0` (wordpress:db to mysql:db) and the peer
//! `relation-1` (mysql:cluster).

use std::rc::Rc;

use jgui_core::Element;
use jgui_runtime::{InspectorConfig, Model, ModelList, Value};
use jgui_widgets::db::{Database, relation_model};
use jgui_widgets::env::Endpoint;
use jgui_widgets::service::ServiceContext;

use crate::fake_env::FakeEnvironment;

pub const MYSQL_CHARM: &str = "cs:precise/mysql-7";
pub const WORDPRESS_CHARM: &str = "cs:precise/wordpress-11";

/// A populated store plus the environment double serving it.
#[derive(Debug)]
pub struct Fixture {
    pub db: Database,
    pub env: Rc<FakeEnvironment>,
    pub wordpress: Model,
    pub mysql: Model,
    pub config: InspectorConfig,
}

impl Fixture {
    /// Context for a page about `service`.
    #[must_use]
    pub fn context(&self, service: &Model) -> ServiceContext {
        ServiceContext::new(self.env.clone(), self.db.clone())
            .with_model(service)
            .with_config(self.config.clone())
    }

    /// Context with no service loaded.
    #[must_use]
    pub fn empty_context(&self) -> ServiceContext {
        ServiceContext::new(self.env.clone(), self.db.clone()).with_config(self.config.clone())
    }
}

/// Page chrome with navbar and footer of known heights, and an empty
/// `#content` container to render into.
#[must_use]
pub fn page_shell(navbar: u32, footer: u32) -> (Element, Element) {
    let content = Element::new("div").with_id("content");
    let body = Element::new("body")
        .with_child(
            Element::new("div")
                .with_class("navbar")
                .with_attr("data-height", navbar.to_string()),
        )
        .with_child(content.clone())
        .with_child(
            Element::new("div")
                .with_class("bottom-navbar")
                .with_attr("data-height", footer.to_string()),
        );
    (body, content)
}

fn charm(id: &str, options: &serde_json::Value) -> Model {
    Model::new(id).with("options", Value::from_json(options))
}

fn unit(id: &str, service: &str, state: &str) -> Model {
    Model::new(id)
        .with("service", service)
        .with("agent_state", state)
}

/// The reference deployment, responding immediately.
#[must_use]
pub fn sample() -> Fixture {
    sample_with(FakeEnvironment::new())
}

/// The reference deployment over a given environment.
#[must_use]
pub fn sample_with(env: FakeEnvironment) -> Fixture {
    let db = Database::new();
    db.charms.add(charm(
        MYSQL_CHARM,
        &serde_json::json!({
            "tuning-level": {"type": "string", "default": "safest", "description": "Tuning profile"},
            "query-cache-size": {"type": "int", "default": -1, "description": "Query cache in bytes"},
            "dataset-size": {"type": "string", "default": "80%"},
            "preferred-storage-engine": {"type": "string", "default": "InnoDB"},
            "flush-ratio": {"type": "float", "default": 0.5},
            "binlog": {"type": "boolean", "default": true},
        }),
    ));
    db.charms.add(charm(WORDPRESS_CHARM, &serde_json::json!({})));

    let wordpress = Model::new("wordpress")
        .with("displayName", "wordpress")
        .with("charm", WORDPRESS_CHARM)
        .with("exposed", true)
        .with("unit_count", 1_i64)
        .with("units", ModelList::new());
    let mysql = Model::new("mysql")
        .with("displayName", "mysql")
        .with("charm", MYSQL_CHARM)
        .with("exposed", false)
        .with("unit_count", 2_i64)
        .with("units", ModelList::new())
        .with(
            "constraints",
            Value::from_json(&serde_json::json!({"cpu": "1", "provider-type": "ec2"})),
        )
        .with(
            "config",
            Value::from_json(&serde_json::json!({"tuning-level": "fast"})),
        )
        .with(
            "aggregated_status",
            Value::from_json(&serde_json::json!({"running": 1, "pending": 1, "error": 0})),
        );
    db.services.add_all([wordpress.clone(), mysql.clone()]);
    db.add_units(&wordpress, vec![unit("wordpress/0", "wordpress", "started")]);
    db.add_units(
        &mysql,
        vec![
            unit("mysql/0", "mysql", "started"),
            unit("mysql/1", "mysql", "pending"),
        ],
    );
    db.relations.add(relation_model(
        "relation-0",
        &[Endpoint::new("wordpress", "db"), Endpoint::new("mysql", "db")],
    ));
    db.relations.add(relation_model("relation-1", &[Endpoint::new("mysql", "cluster")]));

    Fixture {
        db,
        env: Rc::new(env),
        wordpress,
        mysql,
        config: InspectorConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_consistent() {
        let fx = sample();
        assert_eq!(fx.db.services.len(), 2);
        assert_eq!(fx.db.units_for_service(&fx.mysql).len(), 2);
        assert_eq!(fx.mysql.get_models("units").unwrap().len(), 2);
        assert_eq!(fx.db.relations_for_service("mysql").len(), 2);
        assert_eq!(fx.db.relations_for_service("wordpress").len(), 1);
        assert_eq!(fx.context(&fx.mysql).url(None), "/service/mysql/");
    }

    #[test]
    fn shell_carries_heights() {
        let (body, content) = page_shell(70, 50);
        assert!(body.contains(&content));
        assert_eq!(body.query(".navbar").unwrap().attr("data-height").as_deref(), Some("70"));
    }
}
