//! Integration tests for the conversion passes

use richtext_converter::{
    data_xml, downcast, editing_html, editing_view, upcast, upcast_fragments, ConversionOptions,
    DowncastContext, RecoveryAction, RenderOptions, ViewNode,
};
use richtext_model::{keys, names, AttributeValue, ChangeOrigin, Fragment, Model, NodeKind};

fn model_with(blocks: Vec<Fragment>) -> Model {
    let mut model = Model::new();
    model
        .change(ChangeOrigin::Load, |w| {
            let root = w.model().root();
            for (i, block) in blocks.into_iter().enumerate() {
                w.insert(root, i, block)?;
            }
            Ok(())
        })
        .unwrap();
    model
}

fn sample_document() -> Vec<Fragment> {
    let bold = || Fragment::text(" now").with_attr(keys::BOLD, "true");
    vec![
        Fragment::heading(2)
            .with_attr(keys::ANCHOR, "intro")
            .with_child(Fragment::text("Welcome")),
        Fragment::paragraph()
            .with_attr(keys::CUSTOM_CLASSES, "lead")
            .with_child(Fragment::text("see "))
            .with_child(
                Fragment::text("the site")
                    .with_attr(keys::LINK_HREF, "https://example.com")
                    .with_attr(keys::LINK_TITLE, "Example"),
            )
            .with_child(bold()),
        Fragment::list_item("bulleted")
            .with_attr(keys::ANCHOR, "steps")
            .with_child(Fragment::text("one")),
        Fragment::list_item("bulleted")
            .with_attr(keys::ANCHOR, "steps")
            .with_child(Fragment::text("two")),
        Fragment::list_item("numbered").with_child(Fragment::text("first")),
        Fragment::element(NodeKind::Block, names::FORMATTED).with_child(Fragment::text("let x = 1;\n  y")),
        Fragment::embed_block("42")
            .with_attr(keys::LINK_HREF, "https://example.com/embed")
            .with_attr(keys::LINK_TARGET, "_blank"),
        Fragment::element(NodeKind::CustomTag, names::CUSTOM_TAG)
            .with_attr(keys::CUSTOM_TAG_NAME, "factbox")
            .with_attr("customTagParam:title", "Facts")
            .with_child(Fragment::paragraph().with_child(Fragment::text("inside"))),
        Fragment::paragraph()
            .with_child(Fragment::text("inline "))
            .with_child(Fragment::embed_inline("7"))
            .with_child(Fragment::text(" embed")),
    ]
}

#[test]
fn test_upcast_inverts_data_downcast() {
    let original = sample_document();
    let model = model_with(original.clone());
    let options = ConversionOptions::default();

    let xml = data_xml(&model, &options).unwrap();
    let (fragments, recoveries) = upcast_fragments(&xml, &options).unwrap();

    assert!(recoveries.is_empty(), "{:?}", recoveries);
    assert_eq!(fragments, original);
}

#[test]
fn test_upcast_is_idempotent() {
    let options = ConversionOptions::default();
    let source = r#"<?xml version="1.0" encoding="UTF-8"?>
<section xmlns="http://docbook.org/ns/docbook">
  <para>Hello <emphasis>world</emphasis></para>
  <itemizedlist xml:id="todo">
    <listitem><para>a</para></listitem>
    <listitem><para>b</para></listitem>
  </itemizedlist>
  <ezembed xlink:href="ezcontent://42" view="embed"/>
</section>"#;

    let mut first = Model::new();
    upcast(&mut first, source, &options).unwrap();
    let once = data_xml(&first, &options).unwrap();

    let mut second = Model::new();
    upcast(&mut second, &once, &options).unwrap();
    let twice = data_xml(&second, &options).unwrap();

    assert_eq!(once, twice);
    assert!(once.contains(r#"<itemizedlist id="todo">"#));
}

#[test]
fn test_anchor_on_exactly_one_container() {
    let model = model_with(sample_document());
    let view = editing_view(&model, &ConversionOptions::default()).unwrap();

    for anchor in ["intro", "steps"] {
        assert_eq!(view.count_attr("id", anchor), 1, "anchor {}", anchor);
    }

    let mut items = Vec::new();
    view.find_all(&|n: &ViewNode| n.is_tag("li"), &mut items);
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|li| li.attr("id").is_none()));

    let list = view.find(&|n: &ViewNode| n.attr("id") == Some("steps")).unwrap();
    assert_eq!(list.tag(), Some("ul"));
}

#[test]
fn test_same_anchor_containers_merge_in_order() {
    let model = model_with(vec![
        Fragment::list_item("bulleted")
            .with_attr(keys::ANCHOR, "a")
            .with_child(Fragment::text("first")),
        Fragment::list_item("bulleted")
            .with_attr(keys::ANCHOR, "a")
            .with_child(Fragment::text("second")),
    ]);

    for ctx in [DowncastContext::editing(), DowncastContext::data()] {
        let tree = downcast(&model, ctx).unwrap();
        assert_eq!(tree.children().len(), 1);
        let container = &tree.children()[0];
        assert_eq!(container.children().len(), 2);
        assert_eq!(container.children()[0].text_content(), "first");
        assert_eq!(container.children()[1].text_content(), "second");
    }
}

#[test]
fn test_cache_is_never_persisted() {
    let mut model = model_with(vec![Fragment::embed_block("42")]);
    let embed = model.children(model.root())[0];
    model
        .change(ChangeOrigin::Resolver, |w| {
            w.set_attribute(embed, keys::DISPLAY_NAME, "Foo")?;
            w.set_attribute(embed, keys::LOCATION_ID, "7")?;
            w.set_attribute(embed, keys::LANGUAGE_CODES, AttributeValue::from(vec!["eng-GB".to_string()]))
        })
        .unwrap();

    let options = ConversionOptions::default();
    let xml = data_xml(&model, &options).unwrap();
    assert!(xml.contains(r#"<ezembed view="embed" xlink:href="ezcontent://42"/>"#));
    assert!(!xml.contains("Foo"));

    let html = editing_html(&model, &options, &RenderOptions::default()).unwrap();
    assert!(html.contains("Foo"));
}

#[test]
fn test_load_reports_pending_embeds_and_recoveries() {
    let source = r#"<section>
  <para>text <ezembedinline xlink:href="ezcontent://5" view="embed-inline"/></para>
  <ezembed xlink:href="ezcontent://6" view="embed"/>
  <blockquote><para>quoted</para></blockquote>
</section>"#;

    let mut model = Model::new();
    let report = upcast(&mut model, source, &ConversionOptions::default()).unwrap();

    let ids: Vec<_> = report.pending.iter().map(|p| p.external_id.as_str()).collect();
    assert_eq!(ids, vec!["5", "6"]);
    assert_eq!(report.recoveries.len(), 1);
    assert_eq!(report.recoveries[0].action, RecoveryAction::Unwrapped);
    assert_eq!(report.recoveries[0].element, "blockquote");

    for pending in &report.pending {
        let node = model.node(pending.node).unwrap();
        assert!(node.kind.is_embed());
        assert!(node.attribute(keys::DISPLAY_NAME).is_none());
    }
}

#[test]
fn test_syntax_error_fails_load() {
    let mut model = Model::new();
    assert!(upcast(&mut model, "<section><para>", &ConversionOptions::default()).is_err());
    assert!(model.children(model.root()).is_empty());
}

#[test]
fn test_reference_scheme_is_configurable() {
    let options = ConversionOptions {
        reference_scheme: "ezlocation".to_string(),
        ..ConversionOptions::default()
    };
    let model = model_with(vec![Fragment::embed_block("3")]);
    let xml = data_xml(&model, &options).unwrap();
    assert!(xml.contains("ezlocation://3"));
}
