#![forbid(unsafe_code)]

//! Integration tests: the service inspector following store changes made
//! by the service pages.

use jgui_core::Element;
use jgui_harness::simulate::{click_on, submit_value};
use jgui_harness::{init_logging, page_shell, sample};
use jgui_widgets::inspector::{InspectorOptions, ServiceInspector};
use jgui_widgets::service::{ServicePage, compose_page};

fn unit_cells(root: &Element) -> usize {
    root.query_all(".units .unit-grid .unit").len()
}

#[test]
fn units_viewlet_tracks_scaling() {
    init_logging();
    let fx = sample();
    let body = Element::new("body");
    let inspector = ServiceInspector::new(&fx.mysql, &body, InspectorOptions::default()).unwrap();
    click_on(&body, "a.tab[data-viewlet=units]");
    assert_eq!(inspector.active_viewlet().as_deref(), Some("units"));
    assert_eq!(unit_cells(&body), 2);

    let (_shell, content) = page_shell(40, 20);
    let mut page = compose_page(ServicePage::Units, &fx.context(&fx.mysql), &content).unwrap();
    page.render().unwrap();
    submit_value(&content.query("#num-service-units").unwrap(), "4");

    assert_eq!(unit_cells(&body), 4);
    assert_eq!(body.query_all(".unit-grid .pending").len(), 3);
}

#[test]
fn overview_follows_rebind_and_hidden_viewlets_refresh_on_show() {
    let fx = sample();
    let body = Element::new("body");
    let inspector = ServiceInspector::new(&fx.mysql, &body, InspectorOptions::default()).unwrap();
    assert_eq!(body.query("[data-bind=displayName]").unwrap().text(), "mysql");

    inspector.bind(&fx.wordpress).unwrap();
    assert_eq!(body.query("[data-bind=displayName]").unwrap().text(), "wordpress");
    assert_eq!(body.query("[data-bind=running]").unwrap().text(), "");

    inspector.show_viewlet("units").unwrap();
    assert_eq!(unit_cells(&body), 1);
}

#[test]
fn close_button_tears_down() {
    let fx = sample();
    let body = Element::new("body");
    let mut inspector = ServiceInspector::new(&fx.mysql, &body, InspectorOptions::default()).unwrap();
    click_on(&body, ".yui3-juju-inspector .close");
    assert!(inspector.is_destroyed());
    assert!(body.children().is_empty());
    assert!(inspector.bind(&fx.wordpress).is_err());
    inspector.destroy();
    assert!(inspector.composer().is_unbound());
}

#[test]
fn unit_grid_follows_agent_state_changes() {
    let fx = sample();
    let body = Element::new("body");
    let inspector = ServiceInspector::new(&fx.mysql, &body, InspectorOptions::default()).unwrap();
    inspector.show_viewlet("units").unwrap();
    assert_eq!(body.query_all(".unit-grid .pending").len(), 1);

    let pending = fx.mysql.get_models("units").unwrap().get_by_id("mysql/1").unwrap();
    pending.set("agent_state", "started");
    assert_eq!(body.query_all(".unit-grid .pending").len(), 0);
    assert_eq!(body.query_all(".unit-grid .running").len(), 2);

    pending.set("agent_state", "install-error");
    fx.mysql.set("displayName", "database");
    assert_eq!(body.query_all(".unit-grid .error").len(), 1);
    assert_eq!(body.query_all(".unit-grid .running").len(), 1);
}
