use pinboard::template;
use pinboard::template::*;
use std::collections::HashMap;

#[test]
fn test_tokenize_basic() {
    let input = "Hello, {{ username }}! {% if has_messages %}Messages!{% endif %}";
    let tokens = tokenize_template(input);
    println!("Tokens: {:?}", tokens);

    assert_eq!(tokens.len(), 6);
    match &tokens[1] {
        Token::Variable(var) => assert_eq!(var, "username"),
        _ => panic!("Expected variable token"),
    }
    match &tokens[2] {
        Token::Text(text) => assert_eq!(text, "! "),
        _ => panic!("Expected text token"),
    }
}

#[test]
fn test_parse_simple_nodes() {
    let input = "Posted by {{m.id}}";
    let tokens = tokenize_template(input);
    let nodes = parse_tokens(&tokens);

    assert_eq!(nodes.len(), 2);
    match &nodes[1] {
        Node::Variable(var) => assert_eq!(var, "m.id"),
        _ => panic!("Expected variable node"),
    }
}

#[test]
fn test_render_nodes_text_and_variable() {
    let nodes = vec![
        Node::Text("Hello, ".to_string()),
        Node::Variable("username".to_string()),
        Node::Text("!".to_string()),
    ];
    let mut context = HashMap::new();
    context.insert(
        "username".to_string(),
        TemplateValue::String("Alessandro".to_string()),
    );
    let rendered = template::render_nodes(&nodes, &context);
    assert_eq!(rendered, "Hello, Alessandro!");
}

#[test]
fn test_render_if_block_true() {
    let nodes = vec![Node::If {
        condition: "has_messages".to_string(),
        then_body: vec![Node::Text("Some messages".to_string())],
        else_body: vec![Node::Text("No messages yet.".to_string())],
    }];
    let mut context = HashMap::new();
    context.insert("has_messages".to_string(), TemplateValue::Bool(true));
    let rendered = template::render_nodes(&nodes, &context);
    assert_eq!(rendered, "Some messages");
}

#[test]
fn test_render_if_block_false() {
    let nodes = vec![Node::If {
        condition: "has_messages".to_string(),
        then_body: vec![Node::Text("Some messages".to_string())],
        else_body: vec![Node::Text("No messages yet.".to_string())],
    }];
    let mut context = HashMap::new();
    context.insert("has_messages".to_string(), TemplateValue::Bool(false));
    let rendered = template::render_nodes(&nodes, &context);
    assert_eq!(rendered, "No messages yet.");
}

#[test]
fn test_render_for_loop_over_objects() {
    let nodes = vec![Node::For {
        var_name: "m".to_string(),
        list_name: "messages".to_string(),
        body: vec![
            Node::Variable("m.message".to_string()),
            Node::Text(",".to_string()),
        ],
    }];
    let make = |text: &str| {
        let mut fields = HashMap::new();
        fields.insert(
            "message".to_string(),
            TemplateValue::String(text.to_string()),
        );
        TemplateValue::Object(fields)
    };
    let mut context = HashMap::new();
    context.insert(
        "messages".to_string(),
        TemplateValue::List(vec![make("second"), make("first")]),
    );
    let rendered = template::render_nodes(&nodes, &context);
    assert_eq!(rendered, "second,first,");
}

#[test]
fn test_escape_html_specials() {
    assert_eq!(
        escape_html("<b>&\"'</b>"),
        "&lt;b&gt;&amp;&quot;&#x27;&lt;/b&gt;"
    );
    assert_eq!(escape_html("plain text"), "plain text");
}

#[test]
fn test_variables_are_escaped_but_literal_text_is_not() {
    let nodes = vec![
        Node::Text("<li>".to_string()),
        Node::Variable("body".to_string()),
        Node::Text("</li>".to_string()),
    ];
    let mut context = HashMap::new();
    context.insert(
        "body".to_string(),
        TemplateValue::String("<script>alert(1)</script>".to_string()),
    );
    let rendered = template::render_nodes(&nodes, &context);
    // Template markup passes through; interpolated values display as text.
    assert_eq!(
        rendered,
        "<li>&lt;script&gt;alert(1)&lt;/script&gt;</li>"
    );
}

#[test]
fn test_full_listing_template_round() {
    let input = "{% if has_messages %}{% for m in messages %}<li>{{ m.message }}</li>{% endfor %}{% else %}empty{% endif %}";
    let nodes = parse_tokens(&tokenize_template(input));

    let mut context = HashMap::new();
    context.insert("has_messages".to_string(), TemplateValue::Bool(false));
    context.insert("messages".to_string(), TemplateValue::List(vec![]));
    assert_eq!(template::render_nodes(&nodes, &context), "empty");

    let mut fields = HashMap::new();
    fields.insert("message".to_string(), TemplateValue::String("hi".into()));
    context.insert("has_messages".to_string(), TemplateValue::Bool(true));
    context.insert(
        "messages".to_string(),
        TemplateValue::List(vec![TemplateValue::Object(fields)]),
    );
    assert_eq!(template::render_nodes(&nodes, &context), "<li>hi</li>");
}

#[test]
fn test_render_template_from_dir() {
    use std::fs;

    fs::create_dir_all("templates").unwrap();
    fs::write(
        "templates/test_greeting.html",
        "Hello, {{ name }}!",
    )
    .unwrap();

    let mut context = HashMap::new();
    context.insert("name".to_string(), TemplateValue::String("world".into()));
    let resp = render_template("templates", "test_greeting.html", &context);

    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.body, "Hello, world!");
    assert_eq!(
        resp.headers.get("Content-Type").unwrap(),
        "text/html; charset=utf-8"
    );

    fs::remove_file("templates/test_greeting.html").unwrap();
}

#[test]
fn test_template_not_found_branch() {
    let ctx = HashMap::new();
    let resp = render_template("templates", "hopefully_does_not_exist_zzz999.html", &ctx);
    assert_eq!(resp.status_code, 404);
    assert!(resp.body.contains("not found"));
}

#[test]
fn test_unknown_tag_branch() {
    let tokens = vec![
        Token::Tag("unknown_tag whatisthis".into()),
        Token::Text("after".into()),
    ];
    let nodes = parse_tokens(&tokens);
    assert_eq!(nodes.len(), 1);
    assert!(matches!(&nodes[0], Node::Text(_)));
}

#[test]
fn test_template_logging_coverage() {
    set_display_logs(true);
    // Any rendering or parsing will trigger tdebug! branches.
    let ctx = HashMap::new();
    let _ = render_template("templates", "hopefully_does_not_exist_zzz999.html", &ctx);
    set_display_logs(false); // for cleanup
}
