//! Round-trip tests for the formatter: re-serialized source must parse and
//! validate cleanly through the crate's own lexer/parser, not just look
//! plausible to a human reader.

use schwa_compiler::compiler::ast::NodeKind;
use schwa_compiler::compiler::formatter::Formatter;
use schwa_compiler::{AstParser, SchwaParser, Severity, Validator};

fn format_then_reparse(source: &str) -> String {
    let ast = SchwaParser::default().parse(source);
    let formatted = Formatter::format(&ast);

    let mut reparsed = SchwaParser::default().parse(&formatted);
    let mut logger = schwa_compiler::Logger::new();
    Validator::validate(&mut reparsed, &mut logger);

    let errors: Vec<_> = logger.into_diagnostics().into_iter().filter(|d| d.severity == Severity::Error).collect();
    assert!(errors.is_empty(), "formatted output failed to re-parse cleanly: {:?}\n---\n{}", errors, formatted);

    formatted
}

#[test]
fn global_round_trips_without_equals_or_global_keyword() {
    let formatted = format_then_reparse("global int x = 5\n");
    assert!(!formatted.contains("global"), "formatted output still has a `global` keyword: {}", formatted);
    assert_eq!(formatted, "int x = 5\n");
}

#[test]
fn map_round_trips_with_space_separated_offset() {
    let formatted = format_then_reparse("struct Point\n    int x\n    int y\n\nmap Point p 1024\n");
    assert!(formatted.contains("map Point p 1024"), "map declaration formatted incorrectly: {}", formatted);
}

#[test]
fn struct_def_round_trips_without_trailing_colon() {
    let formatted = format_then_reparse("struct Point\n    int x\n    int y\n");
    assert_eq!(formatted, "struct Point\n    int x\n    int y\n");
}

#[test]
fn function_def_round_trips_with_type_name_params_and_no_colon() {
    let formatted = format_then_reparse("int add(int a, int b)\n    return a + b\n");
    assert_eq!(formatted, "int add(int a, int b)\n    return a + b\n");
}

#[test]
fn variable_def_writes_type_before_name() {
    let formatted = format_then_reparse("struct Point\n    int x\n");
    let x_pos = formatted.find("int x").expect("expected \"int x\" in formatted struct field");
    assert!(!formatted[x_pos..].starts_with("x:"), "field written as name-first: {}", formatted);
}

#[test]
fn full_program_round_trips_through_analysis() {
    let source = "struct Point\n    int x\n    int y\n\nmap Point p 1024\n\nglobal int counter = 0\n\nexport int sum(int a, int b)\n    return a + b\n";
    let formatted = format_then_reparse(source);

    let mut ast = SchwaParser::default().parse(&formatted);
    let result = schwa_compiler::Analyzer::new().analyse(&mut ast);
    let errors: Vec<_> =
        result.logger.into_diagnostics().into_iter().filter(|d| d.severity == Severity::Error).collect();
    assert!(errors.is_empty(), "re-parsed, re-analyzed output had errors: {:?}", errors);

    assert!(formatted.contains("struct Point"));
    assert!(!formatted.contains("struct Point:"));
}

#[test]
fn formatting_is_idempotent() {
    let source = "export int sum(int a, int b)\n    return a + b\n";
    let first = format_then_reparse(source);
    let second = format_then_reparse(&first);
    assert_eq!(first, second);
}

#[test]
fn const_and_export_wrappers_still_prefix_the_inner_declaration() {
    let formatted = format_then_reparse("const int x = 5\n");
    assert_eq!(formatted, "const int x = 5\n");

    let ast = SchwaParser::default().parse(&formatted);
    let const_node = {
        fn walk(ast: &schwa_compiler::Ast, node: schwa_compiler::compiler::ast::NodeId) -> Option<schwa_compiler::compiler::ast::NodeId> {
            if ast.node(node).kind == NodeKind::Const {
                return Some(node);
            }
            for &child in &ast.node(node).children {
                if let Some(found) = walk(ast, child) {
                    return Some(found);
                }
            }
            None
        }
        walk(&ast, ast.root)
    };
    assert!(const_node.is_some(), "expected a Const node in the re-parsed tree");
}
