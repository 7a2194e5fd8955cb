use indexmap::IndexMap;
use jtple::{error::Error, Config, Registry, VariableValue};
use serde_json::json;

const CARD: &str = r#"<div class="tpl" name="card">
  <img class="var" name="avatar" src="/blank.png" alt="">
  <p class="var" name="bio" data-note="kept on the live element">bio</p>
</div>"#;

fn card() -> (Registry, jtple::TemplateId) {
    let mut registry = Registry::from_html(CARD, Config::default()).unwrap();
    let card = registry.get_new("card", &json!(null)).unwrap();
    (registry, card)
}

#[test]
fn test_attr_mirrors_element() {
    let (mut registry, card) = card();
    let mut avatar = registry.variable_mut(card, "avatar").unwrap();
    avatar.set_attr("src", "/ann.png").set_attr("alt", "Ann");
    assert_eq!(avatar.attr("src"), Some("/ann.png"));

    let node = avatar.variable().node();
    let cached = avatar.variable().attributes().clone();
    for (name, value) in &cached {
        assert_eq!(registry.document().attr(node, name), Some(value.as_str()));
    }
    assert_eq!(cached.get("alt").map(String::as_str), Some("Ann"));
}

#[test]
fn test_non_allow_listed_attribute_reads_element() {
    let (mut registry, card) = card();
    let mut bio = registry.variable_mut(card, "bio").unwrap();
    // scrubbed copies drop attributes outside the allow-list
    assert_eq!(bio.attr("data-note"), None);
    bio.set_attr("data-note", "fresh");
    assert_eq!(bio.attr("data-note"), Some("fresh"));
    assert!(bio.variable().attributes().get("data-note").is_none());
}

#[test]
fn test_val_and_html() {
    let (mut registry, card) = card();
    let mut bio = registry.variable_mut(card, "bio").unwrap();
    assert_eq!(bio.val(), "");
    bio.set_val("<b>not markup</b>");
    assert_eq!(bio.val(), "<b>not markup</b>");
    assert_eq!(bio.html(), "&lt;b&gt;not markup&lt;/b&gt;");

    bio.set_html("likes <em>rust</em>").unwrap();
    assert_eq!(bio.val(), "likes rust");
    assert_eq!(bio.html(), "likes <em>rust</em>");
}

#[test]
fn test_set_with_tagged_values() {
    let (mut registry, card) = card();
    let mut attrs = IndexMap::new();
    attrs.insert("title".to_string(), "About".to_string());
    attrs.insert("value".to_string(), "Hello there".to_string());

    let mut bio = registry.variable_mut(card, "bio").unwrap();
    bio.set(VariableValue::Attributes(attrs));
    assert_eq!(bio.val(), "Hello there");
    assert_eq!(bio.attr("title"), Some("About"));
    assert_eq!(bio.attr("value"), None);

    bio.set("plain");
    assert_eq!(bio.val(), "plain");
}

#[test]
fn test_template_set_reaches_every_variable_with_name() {
    let mut registry = Registry::from_html(
        r#"<div class="tpl" name="greeting"><b class="var" name="who"></b> and <i class="var" name="who"></i></div>"#,
        Config::default(),
    )
    .unwrap();
    let greeting = registry.get_new("greeting", &json!({"who": 7})).unwrap();
    let root = registry.template(greeting).unwrap().root();
    assert_eq!(registry.document().text_content(root), "7 and 7");
}

#[test]
fn test_unknown_variable() {
    let (mut registry, card) = card();
    assert!(matches!(
        registry.variable_mut(card, "nope"),
        Err(Error::UnknownVariable { .. })
    ));
}
