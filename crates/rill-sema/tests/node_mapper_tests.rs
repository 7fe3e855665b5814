//! Declaration mapping: argument↔parameter, assignee↔assigned object,
//! call↔callable, and the reverse reference lookups.

mod common;

use common::{builder, services};
use rill_ast::node::{DeclFlags, PurityAnnotation};
use rill_ast::{NodeRef, Workspace};
use rill_sema::AssignedObject;

/// `fun f(a: Int, b: Int = 1)` plus a call with the given arguments.
struct CallFixture {
    services: rill_sema::SemanticServices,
    a: NodeRef,
    b: NodeRef,
    arguments: Vec<NodeRef>,
}

enum Arg {
    Positional(i64),
    NamedA(i64),
    NamedB(i64),
}

fn call_fixture(arguments: &[Arg]) -> CallFixture {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let mut b = builder(&workspace, "memory://calls.rill", "demo");

    let a_type = b.named_type("Int", Some(int_class), false);
    let a = b.parameter("a", Some(a_type), None);
    let a_ref = b.node_ref(a);
    let b_type = b.named_type("Int", Some(int_class), false);
    let b_default = b.int_lit(1);
    let b_param = b.parameter("b", Some(b_type), Some(b_default));
    let b_ref = b.node_ref(b_param);
    let f = b.function("f", DeclFlags::empty(), vec![], vec![a, b_param], vec![], PurityAnnotation::Pure);
    let f_ref = b.node_ref(f);

    let argument_nodes: Vec<_> = arguments
        .iter()
        .map(|argument| match argument {
            Arg::Positional(value) => {
                let value = b.int_lit(*value);
                b.argument(value)
            }
            Arg::NamedA(value) => {
                let value = b.int_lit(*value);
                b.named_argument(a_ref, value)
            }
            Arg::NamedB(value) => {
                let value = b.int_lit(*value);
                b.named_argument(b_ref, value)
            }
        })
        .collect();
    let argument_refs: Vec<_> = argument_nodes.iter().map(|it| b.node_ref(*it)).collect();

    let callee = b.reference("f", Some(f_ref));
    let call = b.call(callee, vec![], argument_nodes);
    let statement = b.expression_statement(call);
    let block = b.block(vec![statement]);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    workspace.insert(b.finish(vec![f, pipeline]));
    CallFixture {
        services: services(workspace),
        a: a_ref,
        b: b_ref,
        arguments: argument_refs,
    }
}

#[test]
fn named_arguments_resolve_regardless_of_order() {
    let fixture = call_fixture(&[Arg::NamedB(2), Arg::NamedA(3)]);
    let mapper = fixture.services.node_mapper();

    assert_eq!(mapper.argument_to_parameter(fixture.arguments[0]), Some(fixture.b));
    assert_eq!(mapper.argument_to_parameter(fixture.arguments[1]), Some(fixture.a));
}

#[test]
fn positional_arguments_map_by_ordinal() {
    let fixture = call_fixture(&[Arg::Positional(3)]);
    let mapper = fixture.services.node_mapper();

    assert_eq!(mapper.argument_to_parameter(fixture.arguments[0]), Some(fixture.a));
}

#[test]
fn positional_before_named_is_legal() {
    // f(3, b = 1): the positional argument maps to `a`, the named to `b`.
    let fixture = call_fixture(&[Arg::Positional(3), Arg::NamedB(1)]);
    let mapper = fixture.services.node_mapper();

    assert_eq!(mapper.argument_to_parameter(fixture.arguments[0]), Some(fixture.a));
    assert_eq!(mapper.argument_to_parameter(fixture.arguments[1]), Some(fixture.b));
}

#[test]
fn positional_after_named_is_rejected() {
    // f(a = 1, 3): positional matching is abandoned after a named argument.
    let fixture = call_fixture(&[Arg::NamedA(1), Arg::Positional(3)]);
    let mapper = fixture.services.node_mapper();

    assert_eq!(mapper.argument_to_parameter(fixture.arguments[0]), Some(fixture.a));
    assert_eq!(mapper.argument_to_parameter(fixture.arguments[1]), None);
}

#[test]
fn excess_positional_arguments_map_to_nothing() {
    let fixture = call_fixture(&[Arg::Positional(1), Arg::Positional(2), Arg::Positional(3)]);
    let mapper = fixture.services.node_mapper();

    assert_eq!(mapper.argument_to_parameter(fixture.arguments[0]), Some(fixture.a));
    assert_eq!(mapper.argument_to_parameter(fixture.arguments[1]), Some(fixture.b));
    assert_eq!(mapper.argument_to_parameter(fixture.arguments[2]), None);
}

#[test]
fn non_call_assignment_goes_to_the_first_assignee_only() {
    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://assignees.rill", "demo");

    // val x, y = 1;
    let x = b.placeholder("x");
    let x_ref = b.node_ref(x);
    let y = b.placeholder("y");
    let y_ref = b.node_ref(y);
    let one = b.int_lit(1);
    let statement = b.assignment(vec![x, y], one);
    let block = b.block(vec![statement]);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    let one_ref = b.node_ref(one);
    workspace.insert(b.finish(vec![pipeline]));
    let services = services(workspace);
    let mapper = services.node_mapper();

    assert_eq!(
        mapper.assignee_to_assigned_object(x_ref),
        Some(AssignedObject::Expression(one_ref))
    );
    assert_eq!(mapper.assignee_to_assigned_object(y_ref), None);
}

#[test]
fn call_assignment_distributes_results_by_position() {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let mut b = builder(&workspace, "memory://multi-results.rill", "demo");

    // fun two() -> (u: Int, v: Int); val x, y = two();
    let u_type = b.named_type("Int", Some(int_class), false);
    let u = b.result("u", Some(u_type));
    let u_ref = b.node_ref(u);
    let v_type = b.named_type("Int", Some(int_class), false);
    let v = b.result("v", Some(v_type));
    let v_ref = b.node_ref(v);
    let two = b.function("two", DeclFlags::empty(), vec![], vec![], vec![u, v], PurityAnnotation::Pure);
    let two_ref = b.node_ref(two);

    let x = b.placeholder("x");
    let x_ref = b.node_ref(x);
    let y = b.placeholder("y");
    let y_ref = b.node_ref(y);
    let callee = b.reference("two", Some(two_ref));
    let call = b.call(callee, vec![], vec![]);
    let statement = b.assignment(vec![x, y], call);
    let block = b.block(vec![statement]);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    workspace.insert(b.finish(vec![two, pipeline]));
    let services = services(workspace);
    let mapper = services.node_mapper();

    assert_eq!(
        mapper.assignee_to_assigned_object(x_ref),
        Some(AssignedObject::Result(u_ref))
    );
    assert_eq!(
        mapper.assignee_to_assigned_object(y_ref),
        Some(AssignedObject::Result(v_ref))
    );
}

#[test]
fn class_instantiation_goes_to_the_first_assignee_only() {
    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://instantiation.rill", "demo");

    let class = b.class("C", DeclFlags::empty(), vec![], vec![], vec![], vec![]);
    let class_ref = b.node_ref(class);

    let x = b.placeholder("x");
    let x_ref = b.node_ref(x);
    let y = b.placeholder("y");
    let y_ref = b.node_ref(y);
    let callee = b.reference("C", Some(class_ref));
    let call = b.call(callee, vec![], vec![]);
    let call_ref = b.node_ref(call);
    let statement = b.assignment(vec![x, y], call);
    let block = b.block(vec![statement]);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    workspace.insert(b.finish(vec![class, pipeline]));
    let services = services(workspace);
    let mapper = services.node_mapper();

    assert_eq!(
        mapper.assignee_to_assigned_object(x_ref),
        Some(AssignedObject::Expression(call_ref))
    );
    assert_eq!(mapper.assignee_to_assigned_object(y_ref), None);
}

#[test]
fn call_to_callable_sees_through_aliases() {
    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://aliases.rill", "demo");

    let r = b.result("r", None);
    let f = b.function("f", DeclFlags::empty(), vec![], vec![], vec![r], PurityAnnotation::Pure);
    let f_ref = b.node_ref(f);

    // val g = f; g();
    let g = b.placeholder("g");
    let g_ref = b.node_ref(g);
    let alias = b.reference("f", Some(f_ref));
    let first = b.assignment(vec![g], alias);

    let callee = b.reference("g", Some(g_ref));
    let call = b.call(callee, vec![], vec![]);
    let call_ref = b.node_ref(call);
    let second = b.expression_statement(call);
    let block = b.block(vec![first, second]);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    workspace.insert(b.finish(vec![f, pipeline]));
    let services = services(workspace);

    assert_eq!(services.node_mapper().call_to_callable(call_ref), Some(f_ref));
}

#[test]
fn type_arguments_map_to_type_parameters() {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let string_class = workspace.builtins().string_class;
    let map_class = workspace.builtins().map_class;
    let map_key = workspace.builtins().map_key;
    let map_value = workspace.builtins().map_value;
    let mut b = builder(&workspace, "memory://type-arguments.rill", "demo");

    // Map<String, Int> — positional.
    let key_type = b.named_type("String", Some(string_class), false);
    let key_argument = b.type_argument(key_type);
    let key_argument_ref = b.node_ref(key_argument);
    let value_type = b.named_type("Int", Some(int_class), false);
    let value_argument = b.type_argument(value_type);
    let value_argument_ref = b.node_ref(value_argument);
    let positional_map = b.named_type_with_args(
        "Map",
        Some(map_class),
        vec![key_argument, value_argument],
        false,
    );
    let positional_parameter = b.parameter("p", Some(positional_map), None);

    // Map<V = Int, ...> — a positional argument after a named one is
    // rejected.
    let named_value_type = b.named_type("Int", Some(int_class), false);
    let named_argument = b.named_type_argument(map_value, named_value_type);
    let named_argument_ref = b.node_ref(named_argument);
    let trailing_type = b.named_type("String", Some(string_class), false);
    let trailing_argument = b.type_argument(trailing_type);
    let trailing_argument_ref = b.node_ref(trailing_argument);
    let mixed_map = b.named_type_with_args(
        "Map",
        Some(map_class),
        vec![named_argument, trailing_argument],
        false,
    );
    let mixed_parameter = b.parameter("q", Some(mixed_map), None);

    let block = b.block(vec![]);
    let segment = b.segment(
        "s",
        DeclFlags::empty(),
        vec![positional_parameter, mixed_parameter],
        vec![],
        block,
    );

    workspace.insert(b.finish(vec![segment]));
    let services = services(workspace);
    let mapper = services.node_mapper();

    assert_eq!(mapper.type_argument_to_type_parameter(key_argument_ref), Some(map_key));
    assert_eq!(mapper.type_argument_to_type_parameter(value_argument_ref), Some(map_value));
    assert_eq!(mapper.type_argument_to_type_parameter(named_argument_ref), Some(map_value));
    assert_eq!(mapper.type_argument_to_type_parameter(trailing_argument_ref), None);
}

#[test]
fn reverse_lookups_find_references_and_yields() {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let mut b = builder(&workspace, "memory://reverse.rill", "demo");

    // segment s(p: Int) -> (r: Int) { val x = p + p; yield r = x }
    let p_type = b.named_type("Int", Some(int_class), false);
    let p = b.parameter("p", Some(p_type), None);
    let p_ref = b.node_ref(p);
    let r_type = b.named_type("Int", Some(int_class), false);
    let r = b.result("r", Some(r_type));
    let r_ref = b.node_ref(r);

    let x = b.placeholder("x");
    let x_ref = b.node_ref(x);
    let first_use = b.reference("p", Some(p_ref));
    let first_use_ref = b.node_ref(first_use);
    let second_use = b.reference("p", Some(p_ref));
    let second_use_ref = b.node_ref(second_use);
    let sum = b.infix(rill_ast::node::InfixOperator::Plus, first_use, second_use);
    let first = b.assignment(vec![x], sum);

    let yielded = b.yield_to(Some(r_ref));
    let yielded_ref = b.node_ref(yielded);
    let x_use = b.reference("x", Some(x_ref));
    let x_use_ref = b.node_ref(x_use);
    let second = b.assignment(vec![yielded], x_use);

    let body = b.block(vec![first, second]);
    let segment = b.segment("s", DeclFlags::empty(), vec![p], vec![r], body);

    workspace.insert(b.finish(vec![segment]));
    let services = services(workspace);
    let mapper = services.node_mapper();

    assert_eq!(
        mapper.parameter_to_references(p_ref),
        vec![first_use_ref, second_use_ref]
    );
    assert_eq!(mapper.placeholder_to_references(x_ref), vec![x_use_ref]);
    assert_eq!(mapper.result_to_yields(r_ref), vec![yielded_ref]);
}
