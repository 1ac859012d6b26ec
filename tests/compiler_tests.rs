// tests/compiler_tests.rs

use patter::{
    compile, compile_with, compile_with_sink, standard_registry, Compilation, CompileError,
    Diagnostics, ParamMode, Rst, StandardRegistry,
};

fn compile_ok(source: &str) -> Compilation {
    compile("test.patter", source).expect("compile should succeed")
}

fn compile_err(source: &str) -> CompileError {
    compile("test.patter", source).expect_err("compile should fail")
}

fn root_children(compilation: &Compilation) -> &[Rst] {
    match &compilation.root {
        Rst::Sequence { children, .. } => children,
        other => panic!("root must be a sequence, got {}", other.pretty()),
    }
}

// Compile with errors tolerated, returning the tree and the collected
// diagnostics.
fn compile_lossy(source: &str) -> (Rst, Diagnostics) {
    let mut sink = Diagnostics::new();
    let (root, _) = compile_with_sink(source, standard_registry(), &mut sink);
    (root, sink)
}

// ---
// Sequences and text
// ---

#[test]
fn test_plain_text_with_whitespace() {
    let compilation = compile_ok("Hello, world");
    assert_eq!(
        compilation.root.pretty(),
        r#"(seq "Hello," " " "world")"#
    );
    assert!(compilation.module.is_none());
    assert!(compilation.warnings.is_empty());
}

#[test]
fn test_semicolon_is_text_outside_argument_lists() {
    let compilation = compile_ok("a;b");
    assert_eq!(compilation.root.pretty(), r#"(seq "a" ";" "b")"#);
}

#[test]
fn test_non_structural_punctuation_reads_as_text() {
    let cases = vec!["2+2=4. (a<b)? yes!", "$5 @here a-b ::tag c?!d"];
    for src in cases {
        let compilation = compile_ok(src);
        let mut rebuilt = String::new();
        for child in root_children(&compilation) {
            match child {
                Rst::Text { text, .. } => rebuilt.push_str(text),
                other => panic!("expected only text for {:?}, got {}", src, other.pretty()),
            }
        }
        assert_eq!(rebuilt, src, "text fold failed for: {:?}", src);
    }
}

// ---
// Escape sequences
// ---

#[test]
fn test_escape_nodes_decode_payload_and_quantifier() {
    let cases = vec![
        ("\\u2665", '\u{2665}', 1),
        ("\\U0001F600", '\u{1F600}', 1),
        ("\\3,x", 'x', 3),
        ("\\q", 'q', 1),
    ];
    for (src, character, count) in cases {
        let compilation = compile_ok(src);
        let children = root_children(&compilation);
        assert_eq!(children.len(), 1, "expected one node for: {}", src);
        match &children[0] {
            Rst::Escape {
                character: c,
                count: n,
                ..
            } => {
                assert_eq!(*c, character, "wrong character for: {}", src);
                assert_eq!(*n, count, "wrong count for: {}", src);
            }
            other => panic!("expected an escape for {}, got {}", src, other.pretty()),
        }
    }
}

#[test]
fn test_invalid_code_points_are_reported() {
    for src in ["\\uZZZZ", "\\uD800"] {
        let error = compile_err(src);
        assert!(
            error.has_code("invalid_code_point"),
            "missing code for: {}",
            src
        );
    }
}

#[test]
fn test_code_point_digits_must_be_pure_hex() {
    // The radix parser tolerates a leading sign; the decoder must not.
    for src in ["\\u+2AF", "\\U+001F600"] {
        let error = compile_err(src);
        assert!(
            error.has_code("invalid_code_point"),
            "missing code for: {}",
            src
        );
    }
}

#[test]
fn test_oversized_quantifiers_clamp() {
    let compilation = compile_ok("\\99999999999999999999,x");
    match &root_children(&compilation)[0] {
        Rst::Escape {
            character, count, ..
        } => {
            assert_eq!(*character, 'x');
            assert_eq!(*count, usize::MAX);
        }
        other => panic!("expected an escape, got {}", other.pretty()),
    }
}

// ---
// Blocks
// ---

#[test]
fn test_block_elements_split_on_pipes() {
    let compilation = compile_ok("{a|b|c}");
    let children = root_children(&compilation);
    assert_eq!(children.len(), 1);
    match &children[0] {
        Rst::Block { elements, span } => {
            assert_eq!(elements.len(), 3);
            assert_eq!(span.start, 0);
            assert_eq!(span.end, 7);
        }
        other => panic!("expected a block, got {}", other.pretty()),
    }
}

#[test]
fn test_empty_blocks_still_carry_elements() {
    // `{}` is one empty element, `{|}` is two; the runtime picks among
    // whatever is there.
    let cases = vec![("{}", 1), ("{|}", 2), ("{a||b}", 3)];
    for (src, expected) in cases {
        let compilation = compile_ok(src);
        match &root_children(&compilation)[0] {
            Rst::Block { elements, .. } => {
                assert_eq!(elements.len(), expected, "wrong element count for: {}", src);
                for element in elements {
                    assert!(matches!(element, Rst::Sequence { .. }));
                }
            }
            other => panic!("expected a block for {}, got {}", src, other.pretty()),
        }
    }
}

// ---
// Function tags
// ---

#[test]
fn test_function_call_with_one_argument() {
    let compilation = compile_ok("[rep:10]");
    let children = root_children(&compilation);
    assert_eq!(children.len(), 1);
    match &children[0] {
        Rst::Function {
            name,
            signature,
            args,
            span,
        } => {
            assert_eq!(name, "rep");
            assert_eq!(signature.name, "rep");
            assert_eq!(args.len(), 1);
            assert_eq!(args[0].pretty(), r#"(seq "10")"#);
            assert_eq!(span.start, 0);
            assert_eq!(span.end, 8);
        }
        other => panic!("expected a function, got {}", other.pretty()),
    }
}

#[test]
fn test_zero_argument_call_through_an_alias() {
    let compilation = compile_ok("[rc]");
    match &root_children(&compilation)[0] {
        Rst::Function {
            name,
            signature,
            args,
            ..
        } => {
            assert_eq!(name, "rc");
            assert_eq!(signature.name, "repcount");
            assert_eq!(signature.min_args, 0);
            assert_eq!(signature.max_args, Some(0));
            assert!(args.is_empty());
        }
        other => panic!("expected a function, got {}", other.pretty()),
    }
}

#[test]
fn test_empty_argument_is_one_empty_sequence() {
    let compilation = compile_ok("[rep:]");
    match &root_children(&compilation)[0] {
        Rst::Function { args, .. } => {
            assert_eq!(args.len(), 1);
            match &args[0] {
                Rst::Sequence { children, .. } => assert!(children.is_empty()),
                other => panic!("expected a sequence argument, got {}", other.pretty()),
            }
        }
        other => panic!("expected a function, got {}", other.pretty()),
    }
}

#[test]
fn test_arguments_split_on_semicolons() {
    let compilation = compile_ok("[sep:a;b]");
    match &root_children(&compilation)[0] {
        Rst::Function { name, args, .. } => {
            assert_eq!(name, "sep");
            assert_eq!(args.len(), 2);
            assert_eq!(args[0].pretty(), r#"(seq "a")"#);
            assert_eq!(args[1].pretty(), r#"(seq "b")"#);
        }
        other => panic!("expected a function, got {}", other.pretty()),
    }
}

#[test]
fn test_nested_block_inside_an_argument() {
    let compilation = compile_ok("[rep:{a|[sep:X]}]");
    assert_eq!(
        compilation.root.pretty(),
        r#"(seq (fn rep (seq (block (seq "a") (seq (fn sep (seq "X")))))))"#
    );
}

// ---
// Failed tags
// ---

#[test]
fn test_unknown_function_aborts_only_its_tag() {
    let error = compile_err("[made.up.tag]");
    assert!(error.has_code("nonexistent_function"));
    assert!(error.has_code("unexpected_token"));
}

#[test]
fn test_unknown_overload_with_a_custom_registry() {
    let mut registry = StandardRegistry::new();
    registry.register("double", 1, Some(1));
    let error = compile_with("test.patter", "[double:a;b]", &registry)
        .expect_err("arity mismatch should fail");
    assert!(error.has_code("nonexistent_overload"));
    assert_eq!(error.error_count(), 1);
    assert!(error.to_string().contains("failed with 1 error"));
}

#[test]
fn test_failed_tag_does_not_derail_the_rest() {
    let (root, sink) = compile_lossy("[rep:a;b] ok [sep:x]");
    assert!(sink.has_errors());
    assert_eq!(sink.len(), 1);
    assert_eq!(
        sink.iter().next().unwrap().kind.code_suffix(),
        "nonexistent_overload"
    );

    // The bad tag produced no node; everything after it parsed normally.
    let Rst::Sequence { children, .. } = &root else {
        panic!("root must be a sequence");
    };
    match children.last() {
        Some(Rst::Function { name, .. }) => assert_eq!(name, "sep"),
        other => panic!("expected a trailing function call, got {:?}", other),
    }
}

#[test]
fn test_parsing_recovers_inside_blocks() {
    let (root, sink) = compile_lossy("{[zzz]|ok} [rep:1]");
    assert_eq!(sink.len(), 1);
    assert_eq!(
        sink.iter().next().unwrap().kind.code_suffix(),
        "nonexistent_function"
    );

    let Rst::Sequence { children, .. } = &root else {
        panic!("root must be a sequence");
    };
    match &children[0] {
        Rst::Block { elements, .. } => assert_eq!(elements.len(), 2),
        other => panic!("expected a block, got {}", other.pretty()),
    }
    match children.last() {
        Some(Rst::Function { name, .. }) => assert_eq!(name, "rep"),
        other => panic!("expected a trailing function call, got {:?}", other),
    }
}

#[test]
fn test_stray_terminators_are_reported() {
    for src in ["}", "|x", "]"] {
        let error = compile_err(src);
        assert!(error.has_code("unexpected_token"), "missing code for: {:?}", src);
    }
}

#[test]
fn test_input_ending_mid_construct_reports_once() {
    for src in ["{a", "[rep:{a"] {
        let error = compile_err(src);
        assert_eq!(error.error_count(), 1, "expected one error for: {:?}", src);
        assert!(
            error.has_code("unexpected_end_of_input"),
            "missing code for: {:?}",
            src
        );
    }
}

// ---
// Replacers
// ---

#[test]
fn test_replacer_with_two_arguments() {
    let compilation = compile_ok("[`a+`i:banana;X]");
    match &root_children(&compilation)[0] {
        Rst::Replacer {
            regex_source,
            pattern,
            subject,
            replacement,
            ..
        } => {
            assert_eq!(regex_source, "a+");
            assert!(pattern.is_match("BANANA"), "flags were not applied");
            assert_eq!(subject.pretty(), r#"(seq "banana")"#);
            assert_eq!(replacement.pretty(), r#"(seq "X")"#);
        }
        other => panic!("expected a replacer, got {}", other.pretty()),
    }
}

#[test]
fn test_replacer_argument_count_must_be_two() {
    for src in ["[`a`:one]", "[`a`:x;y;z]"] {
        let error = compile_err(src);
        assert!(
            error.has_code("replacer_argument_count"),
            "missing code for: {}",
            src
        );
    }
}

#[test]
fn test_bad_pattern_still_consumes_its_arguments() {
    // The broken pattern is reported, but the reader stays in sync and the
    // next tag parses.
    let (root, sink) = compile_lossy("[`(`:a;b][rep:1]");
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.iter().next().unwrap().kind.code_suffix(), "invalid_regex");

    let Rst::Sequence { children, .. } = &root else {
        panic!("root must be a sequence");
    };
    assert_eq!(children.len(), 1);
    assert!(matches!(&children[0], Rst::Function { name, .. } if name == "rep"));
}

#[test]
fn test_unknown_regex_flags_are_each_reported() {
    let error = compile_err("[`a`qz:x;y]");
    assert_eq!(error.error_count(), 2);
    let flag_errors = error
        .diagnostics()
        .iter()
        .filter(|d| d.kind.code_suffix() == "unknown_regex_flag")
        .count();
    assert_eq!(flag_errors, 2);
}

// ---
// Subroutines
// ---

#[test]
fn test_module_definition_exports_the_subroutine() {
    let compilation = compile_ok("[$[.greet:@name: Hello, \\name!]");
    let module = compilation.module.as_ref().expect("module should exist");
    assert!(module.has("greet"));
    assert_eq!(module.names(), vec!["greet".to_string()]);

    match &root_children(&compilation)[0] {
        Rst::DefineSubroutine {
            name, parameters, ..
        } => {
            assert_eq!(name, "greet");
            assert_eq!(parameters.len(), 1);
            assert_eq!(parameters[0].0, "name");
            assert_eq!(parameters[0].1, ParamMode::Loose);
        }
        other => panic!("expected a definition, got {}", other.pretty()),
    }
}

#[test]
fn test_both_parameter_group_closings_are_accepted() {
    // The `]` after the parameters is optional; the `:` before the body is
    // not.
    let with_bracket = compile_ok("[$[.greet:@name;time]: hi]");
    let without_bracket = compile_ok("[$[.greet:@name;time: hi]");
    for compilation in [&with_bracket, &without_bracket] {
        match &root_children(compilation)[0] {
            Rst::DefineSubroutine { parameters, .. } => {
                assert_eq!(
                    parameters,
                    &vec![
                        ("name".to_string(), ParamMode::Loose),
                        ("time".to_string(), ParamMode::Greedy),
                    ]
                );
            }
            other => panic!("expected a definition, got {}", other.pretty()),
        }
    }
}

#[test]
fn test_repeated_parameter_keeps_the_last_mode() {
    let compilation = compile_ok("[$[f: x; @x]: b]");
    match &root_children(&compilation)[0] {
        Rst::DefineSubroutine { parameters, .. } => {
            assert_eq!(parameters, &vec![("x".to_string(), ParamMode::Loose)]);
        }
        other => panic!("expected a definition, got {}", other.pretty()),
    }
}

#[test]
fn test_private_definition_exports_nothing() {
    let compilation = compile_ok("[$[c]: z]");
    assert!(compilation.module.is_none());
    assert!(matches!(
        &root_children(&compilation)[0],
        Rst::DefineSubroutine { name, .. } if name == "c"
    ));
}

#[test]
fn test_module_collects_every_exported_definition() {
    let compilation = compile_ok("[$[.a]: x][$[.b]: y]");
    let module = compilation.module.as_ref().expect("module should exist");
    assert_eq!(module.names(), vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_subroutine_calls() {
    let compilation = compile_ok("[$greet]");
    match &root_children(&compilation)[0] {
        Rst::CallSubroutine {
            name,
            module_function,
            args,
            ..
        } => {
            assert_eq!(name, "greet");
            assert!(module_function.is_none());
            assert!(args.is_empty());
        }
        other => panic!("expected a call, got {}", other.pretty()),
    }

    let with_args = compile_ok("[$greet: Bob]");
    match &root_children(&with_args)[0] {
        Rst::CallSubroutine { args, .. } => assert_eq!(args.len(), 1),
        other => panic!("expected a call, got {}", other.pretty()),
    }

    let qualified = compile_ok("[$lib.greet: x]");
    match &root_children(&qualified)[0] {
        Rst::CallSubroutine {
            name,
            module_function,
            args,
            ..
        } => {
            assert_eq!(name, "lib");
            assert_eq!(module_function.as_deref(), Some("greet"));
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected a call, got {}", other.pretty()),
    }
}

#[test]
fn test_missing_body_colon_abandons_the_definition() {
    let (root, sink) = compile_lossy("[$[f] oops]");
    assert!(sink.has_errors());
    assert_eq!(sink.len(), 2);
    for diagnostic in sink.iter() {
        assert_eq!(diagnostic.kind.code_suffix(), "unexpected_token");
    }

    let Rst::Sequence { children, .. } = &root else {
        panic!("root must be a sequence");
    };
    assert_eq!(children.len(), 1);
    assert!(matches!(&children[0], Rst::Text { text, .. } if text == "oops"));
}
