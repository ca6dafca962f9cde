#[cfg(test)]
mod tests {
    use crate::dom::NodeRef;
    use crate::error::ControllerError;
    use crate::host::ControllerOptions;
    use crate::targets::{kebab_case, targetize_selector, TargetResolver, TargetSpec, TargetValue};
    use crate::test_support::{by_id, counting_action, fixture};
    use crate::CrystallizedController;

    fn texts(nodes: &[NodeRef]) -> Vec<String> {
        nodes.iter().map(|node| node.text_content().trim().to_string()).collect()
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("message"), "message");
        assert_eq!(kebab_case("dupMessage"), "dup-message");
        assert_eq!(kebab_case("FooBar"), "foo-bar");
        assert_eq!(kebab_case("item2Label"), "item2-label");
        assert_eq!(kebab_case("foo_bar"), "foo-bar");
    }

    #[test]
    fn test_targetize_selector() {
        assert_eq!(
            targetize_selector("dupMessage", "@", "x-widget"),
            "*[x-widget-target='dup-message']"
        );
        assert_eq!(
            targetize_selector("anything", "@message", "x-widget"),
            "[x-widget-target='message']"
        );
        assert_eq!(
            targetize_selector("anything", "div.@foo > span", "host"),
            "div.[host-target='foo'] > span"
        );
        assert_eq!(targetize_selector("plain", "button", "x-widget"), "button");
        // Only the bare shorthand is kebab-cased.
        assert_eq!(
            targetize_selector("x", "@fooBar", "x-widget"),
            "[x-widget-target='fooBar']"
        );
    }

    #[test]
    fn test_finds_the_right_elements() {
        let (_doc, host) = fixture(
            r#"
            <targets-component>
              <p targets-component-target="message">Hello</p>
              <p targets-component-target="extra-message">One</p>
              <div><p targets-component-target="extra-message">Two</p></div>
            </targets-component>
            "#,
        );
        let targets = TargetResolver::new(
            &host,
            vec![
                ("message", TargetSpec::single("@")),
                ("dupMessage", TargetSpec::single("@message")),
                ("extra", TargetSpec::multi("[targets-component-target='extra-message']")),
            ],
            ControllerOptions::light(),
        )
        .unwrap();

        assert_eq!(targets.target("message").unwrap().text_content(), "Hello");
        assert_eq!(targets.target("dupMessage"), targets.target("message"));
        assert_eq!(texts(&targets.targets("extra")), vec!["One", "Two"]);
        assert!(targets.accessor("extra").unwrap().is_multi());
        assert_eq!(
            targets.accessor("message").unwrap().selector(),
            "*[targets-component-target='message']"
        );
    }

    #[test]
    fn test_nested_component_targets_are_scoped() {
        let (doc, outer) = fixture(
            r#"
            <targets-component id="outer">
              <button id="outer-one"></button>
              <targets-component id="inner">
                <button id="inner-one"></button>
                <button id="inner-two"></button>
              </targets-component>
              <button id="outer-two"></button>
            </targets-component>
            "#,
        );
        let declared = || {
            vec![
                ("button", TargetSpec::single("button")),
                ("buttons", TargetSpec::multi("button")),
            ]
        };

        let outer_targets =
            TargetResolver::new(&outer, declared(), ControllerOptions::light()).unwrap();
        assert_eq!(outer_targets.target("button").unwrap(), by_id(outer.element(), "outer-one"));
        let ids: Vec<_> = outer_targets
            .targets("buttons")
            .iter()
            .filter_map(|b| b.attribute("id"))
            .collect();
        assert_eq!(ids, vec!["outer-one", "outer-two"]);

        let inner_el = by_id(outer.element(), "inner");
        let inner = crate::host::Host::new(doc.clone(), inner_el).unwrap();
        let inner_targets =
            TargetResolver::new(&inner, declared(), ControllerOptions::light()).unwrap();
        assert_eq!(inner_targets.target("button").unwrap(), by_id(outer.element(), "inner-one"));
        assert_eq!(inner_targets.targets("buttons").len(), 2);
    }

    #[test]
    fn test_single_target_checks_only_first_match() {
        let (_doc, host) = fixture(
            r#"
            <x-widget>
              <x-widget><span x-widget-target="label">inner</span></x-widget>
              <span x-widget-target="label">outer</span>
            </x-widget>
            "#,
        );
        let targets = TargetResolver::new(
            &host,
            vec![
                ("label", TargetSpec::single("@")),
                ("labels", TargetSpec::multi("@label")),
            ],
            ControllerOptions::light(),
        )
        .unwrap();

        // The first document-order match is foreign, so the single read is empty.
        assert_eq!(targets.resolve("label"), Some(TargetValue::One(None)));
        assert_eq!(texts(&targets.targets("labels")), vec!["outer"]);
    }

    #[test]
    fn test_multi_target_excludes_nested_matches() {
        let (_doc, host) = fixture(
            r#"
            <x-widget>
              <li x-widget-target="items">a</li>
              <x-widget><li x-widget-target="items">nested</li></x-widget>
              <li x-widget-target="items">b</li>
            </x-widget>
            "#,
        );
        let targets =
            TargetResolver::from_json(&host, r#"{"items": ["@"]}"#, ControllerOptions::light())
                .unwrap();

        assert_eq!(host.element().select("[x-widget-target='items']").unwrap().len(), 3);
        assert_eq!(texts(&targets.targets("items")), vec!["a", "b"]);
    }

    #[test]
    fn test_nested_host_belongs_to_itself() {
        let (doc, host) = fixture(
            r#"
            <x-widget>
              <x-widget id="child" x-widget-target="child">
                <span id="grandchild" x-widget-target="child"></span>
              </x-widget>
            </x-widget>
            "#,
        );
        let declared = || vec![("child", TargetSpec::multi("@"))];

        let outer = TargetResolver::new(&host, declared(), ControllerOptions::light()).unwrap();
        assert!(outer.targets("child").is_empty());
        assert_eq!(outer.target("child"), None);

        let child = crate::host::Host::new(doc.clone(), by_id(host.element(), "child")).unwrap();
        let inner = TargetResolver::new(&child, declared(), ControllerOptions::light()).unwrap();
        assert_eq!(inner.targets("child"), vec![by_id(host.element(), "grandchild")]);
    }

    #[test]
    fn test_reads_are_live() {
        let (doc, host) = fixture(r#"<x-widget><ul></ul></x-widget>"#);
        let targets = TargetResolver::new(
            &host,
            vec![("entries", TargetSpec::multi("li"))],
            ControllerOptions::light(),
        )
        .unwrap();
        assert!(targets.targets("entries").is_empty());

        let list = host.element().select("ul").unwrap().remove(0);
        doc.append_html(&list, "<li>one</li><li>two</li>").unwrap();
        assert_eq!(texts(&targets.targets("entries")), vec!["one", "two"]);

        let first = targets.target("entries").unwrap();
        assert!(doc.remove(&first));
        assert_eq!(texts(&targets.targets("entries")), vec!["two"]);
    }

    #[test]
    fn test_shadow_targets_use_host_prefix() {
        let (doc, host) = fixture(
            r#"<x-widget><p x-widget-target="title">light</p></x-widget>"#,
        );
        let targets = TargetResolver::new(
            &host,
            vec![("title", TargetSpec::single("@"))],
            ControllerOptions::shadow(),
        )
        .unwrap();
        assert_eq!(targets.accessor("title").unwrap().selector(), "*[host-target='title']");

        // No shadow root yet.
        assert_eq!(targets.target("title"), None);

        let shadow = host.attach_shadow().unwrap();
        doc.append_html(
            &shadow,
            r#"<h1 host-target="title">shadow</h1><x-widget><h2 host-target="title">x</h2></x-widget>"#,
        )
        .unwrap();
        assert_eq!(targets.target("title").unwrap().text_content(), "shadow");

        let all = TargetResolver::new(
            &host,
            vec![("title", TargetSpec::multi("@"))],
            ControllerOptions::shadow(),
        )
        .unwrap();
        // Shadow roots are encapsulated, nested same-tag markup is not filtered.
        assert_eq!(all.targets("title").len(), 2);
    }

    #[test]
    fn test_unknown_and_missing_targets() {
        let (_doc, host) = fixture("<x-widget><p>nothing marked</p></x-widget>");
        let targets = TargetResolver::new(
            &host,
            vec![("message", TargetSpec::single("@")), ("items", TargetSpec::multi("@"))],
            ControllerOptions::light(),
        )
        .unwrap();

        assert_eq!(targets.resolve("message"), Some(TargetValue::One(None)));
        assert_eq!(targets.resolve("items"), Some(TargetValue::Many(vec![])));
        assert_eq!(targets.resolve("undeclared"), None);
        assert_eq!(targets.target("undeclared"), None);
        assert!(targets.targets("undeclared").is_empty());
    }

    #[test]
    fn test_later_declaration_replaces_earlier() {
        let (_doc, host) = fixture(r#"<x-widget><a></a><b></b></x-widget>"#);
        let targets = TargetResolver::new(
            &host,
            vec![("el", TargetSpec::single("a")), ("el", TargetSpec::single("b"))],
            ControllerOptions::light(),
        )
        .unwrap();
        assert_eq!(targets.accessors().len(), 1);
        assert_eq!(targets.target("el").unwrap().local_name(), Some("b"));
    }

    #[test]
    fn test_invalid_declarations() {
        let (_doc, host) = fixture("<x-widget></x-widget>");

        let err = TargetResolver::from_json(&host, "not json", ControllerOptions::light())
            .err()
            .unwrap();
        assert!(matches!(err, ControllerError::InvalidTargets(_)));

        let err = TargetResolver::from_json(
            &host,
            r#"{"items": ["li", "p"]}"#,
            ControllerOptions::light(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ControllerError::InvalidTargets(_)));

        let err = TargetResolver::new(
            &host,
            vec![("broken", TargetSpec::single("div["))],
            ControllerOptions::light(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ControllerError::InvalidSelector { .. }));
    }

    #[test]
    fn test_target_spec_deserializes() {
        let single: TargetSpec = serde_json::from_str(r#""@""#).unwrap();
        assert_eq!(single, TargetSpec::single("@"));
        assert!(!single.is_multi());

        let multi: TargetSpec = serde_json::from_str(r#"["button"]"#).unwrap();
        assert_eq!(multi, TargetSpec::multi("button"));
        assert_eq!(multi.selector(), "button");
    }

    #[test]
    fn test_crystallized_controller_wires_everything() {
        let (doc, host) = fixture(
            r#"<x-widget><button x-widget-action="save">light</button></x-widget>"#,
        );
        let saves = counting_action(&host, "save");
        let shadow = host.attach_shadow().unwrap();
        doc.append_html(
            &shadow,
            r#"<button host-action="save" host-target="go">shadow</button>"#,
        )
        .unwrap();

        let controller =
            CrystallizedController::new(&host, vec![("go", TargetSpec::single("@"))]).unwrap();
        assert_eq!(host.controller_count(), 2);
        host.connect();

        let light = host.element().select("button").unwrap().remove(0);
        doc.click(&light);
        let go = controller.targets.target("go").unwrap();
        assert_eq!(go.text_content(), "shadow");
        doc.click(&go);
        assert_eq!(saves.get(), 2);

        assert!(!controller.actions.is_shadow());
        assert!(controller.shadow_actions.is_shadow());
        assert_eq!(controller.shadow_actions.registered_actions().len(), 1);
    }
}
