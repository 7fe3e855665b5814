//! Type inference over expressions, declarations, calls, and type nodes.

mod common;

use common::{builder, services};
use rill_ast::node::{DeclFlags, InfixOperator, PrefixOperator, PurityAnnotation};
use rill_ast::Workspace;
use rill_types::{NamedTupleType, Type};

#[test]
fn literals_have_primitive_class_types() {
    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://literals.rill", "demo");

    let boolean = b.bool_lit(true);
    let int = b.int_lit(1);
    let float = b.float_lit(1.5);
    let string = b.string_lit("hello");
    let null = b.null_lit();

    let statements = vec![boolean, int, float, string, null]
        .into_iter()
        .map(|expression| b.expression_statement(expression))
        .collect();
    let block = b.block(statements);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    let boolean = b.node_ref(boolean);
    let int = b.node_ref(int);
    let float = b.node_ref(float);
    let string = b.node_ref(string);
    let null = b.node_ref(null);
    let document = b.finish(vec![pipeline]);
    workspace.insert(document);
    let services = services(workspace);
    let types = services.types();

    assert_eq!(types.compute_type(boolean), types.boolean_type());
    assert_eq!(types.compute_type(int), types.int_type());
    assert_eq!(types.compute_type(float), types.float_type());
    assert_eq!(types.compute_type(string), types.string_type());
    assert_eq!(types.compute_type(null), types.nothing_or_null_type());
    assert!(types.compute_type(null).is_explicitly_nullable());
}

#[test]
fn arithmetic_is_int_only_for_two_ints() {
    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://arithmetic.rill", "demo");

    let both_ints = {
        let left = b.int_lit(1);
        let right = b.int_lit(1);
        b.infix(InfixOperator::Plus, left, right)
    };
    let mixed = {
        let left = b.int_lit(1);
        let right = b.float_lit(1.0);
        b.infix(InfixOperator::Plus, left, right)
    };
    let negated_int = {
        let operand = b.int_lit(3);
        b.prefix(PrefixOperator::Negate, operand)
    };
    let negated_float = {
        let operand = b.float_lit(3.0);
        b.prefix(PrefixOperator::Negate, operand)
    };
    let comparison = {
        let left = b.int_lit(1);
        let right = b.int_lit(2);
        b.infix(InfixOperator::LessThan, left, right)
    };

    let statements = vec![both_ints, mixed, negated_int, negated_float, comparison]
        .into_iter()
        .map(|expression| b.expression_statement(expression))
        .collect();
    let block = b.block(statements);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    let both_ints = b.node_ref(both_ints);
    let mixed = b.node_ref(mixed);
    let negated_int = b.node_ref(negated_int);
    let negated_float = b.node_ref(negated_float);
    let comparison = b.node_ref(comparison);
    workspace.insert(b.finish(vec![pipeline]));
    let services = services(workspace);
    let types = services.types();

    assert_eq!(types.compute_type(both_ints), types.int_type());
    assert_eq!(types.compute_type(mixed), types.float_type());
    assert_eq!(types.compute_type(negated_int), types.int_type());
    assert_eq!(types.compute_type(negated_float), types.float_type());
    assert_eq!(types.compute_type(comparison), types.boolean_type());
}

#[test]
fn elvis_strips_nullability_and_joins_with_right_type() {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let mut b = builder(&workspace, "memory://elvis.rill", "demo");

    let nullable_int = b.named_type("Int", Some(int_class), true);
    let nullable_parameter = b.parameter("p", Some(nullable_int), None);
    let plain_int = b.named_type("Int", Some(int_class), false);
    let plain_parameter = b.parameter("q", Some(plain_int), None);
    let nullable_parameter_ref = b.node_ref(nullable_parameter);
    let plain_parameter_ref = b.node_ref(plain_parameter);

    // p ?: 1 — nullable left joins with the right type.
    let joined = {
        let left = b.reference("p", Some(nullable_parameter_ref));
        let right = b.int_lit(1);
        b.infix(InfixOperator::Elvis, left, right)
    };
    // q ?: 1.5 — non-nullable left; the right side is discarded.
    let discarded = {
        let left = b.reference("q", Some(plain_parameter_ref));
        let right = b.float_lit(1.5);
        b.infix(InfixOperator::Elvis, left, right)
    };
    // p ?: 1.5 — Int and Float join at Number.
    let widened = {
        let left = b.reference("p", Some(nullable_parameter_ref));
        let right = b.float_lit(1.5);
        b.infix(InfixOperator::Elvis, left, right)
    };

    let statements = vec![joined, discarded, widened]
        .into_iter()
        .map(|expression| b.expression_statement(expression))
        .collect();
    let block = b.block(statements);
    let segment = b.segment(
        "s",
        DeclFlags::empty(),
        vec![nullable_parameter, plain_parameter],
        vec![],
        block,
    );

    let joined = b.node_ref(joined);
    let discarded = b.node_ref(discarded);
    let widened = b.node_ref(widened);
    workspace.insert(b.finish(vec![segment]));
    let services = services(workspace);
    let types = services.types();

    assert_eq!(types.compute_type(joined), types.int_type());
    assert_eq!(types.compute_type(discarded), types.int_type());

    let number = types.compute_type(services.builtins().number_class);
    assert_eq!(types.compute_type(widened), number);
}

#[test]
fn list_literal_joins_element_types_at_lowest_common_supertype() {
    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://lists.rill", "demo");

    let homogeneous = {
        let one = b.int_lit(1);
        let two = b.int_lit(2);
        b.list_literal(vec![one, two])
    };
    let mixed = {
        let one = b.int_lit(1);
        let half = b.float_lit(0.5);
        b.list_literal(vec![one, half])
    };

    let statements = vec![homogeneous, mixed]
        .into_iter()
        .map(|expression| b.expression_statement(expression))
        .collect();
    let block = b.block(statements);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    let homogeneous = b.node_ref(homogeneous);
    let mixed = b.node_ref(mixed);
    workspace.insert(b.finish(vec![pipeline]));
    let services = services(workspace);
    let types = services.types();

    assert_eq!(types.compute_type(homogeneous), types.list_type(types.int_type()));
    let number = types.compute_type(services.builtins().number_class);
    assert_eq!(types.compute_type(mixed), types.list_type(number));
}

#[test]
fn call_of_function_has_result_type() {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let float_class = workspace.builtins().float_class;
    let mut b = builder(&workspace, "memory://calls.rill", "demo");

    // fun one(a: Int) -> (r: Float)
    let a_type = b.named_type("Int", Some(int_class), false);
    let a = b.parameter("a", Some(a_type), None);
    let r_type = b.named_type("Float", Some(float_class), false);
    let r = b.result("r", Some(r_type));
    let one = b.function("one", DeclFlags::empty(), vec![], vec![a], vec![r], PurityAnnotation::Pure);
    let one_ref = b.node_ref(one);

    // fun two() -> (u: Int, v: Float)
    let u_type = b.named_type("Int", Some(int_class), false);
    let u = b.result("u", Some(u_type));
    let v_type = b.named_type("Float", Some(float_class), false);
    let v = b.result("v", Some(v_type));
    let two = b.function("two", DeclFlags::empty(), vec![], vec![], vec![u, v], PurityAnnotation::Pure);
    let two_ref = b.node_ref(two);

    let single_result_call = {
        let callee = b.reference("one", Some(one_ref));
        let argument_value = b.int_lit(1);
        let argument = b.argument(argument_value);
        b.call(callee, vec![], vec![argument])
    };
    let multi_result_call = {
        let callee = b.reference("two", Some(two_ref));
        b.call(callee, vec![], vec![])
    };

    let statements = vec![single_result_call, multi_result_call]
        .into_iter()
        .map(|expression| b.expression_statement(expression))
        .collect();
    let block = b.block(statements);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    let single_result_call = b.node_ref(single_result_call);
    let multi_result_call = b.node_ref(multi_result_call);
    workspace.insert(b.finish(vec![one, two, pipeline]));
    let services = services(workspace);
    let types = services.types();

    assert_eq!(types.compute_type(single_result_call), types.float_type());

    match types.compute_type(multi_result_call) {
        Type::NamedTuple(NamedTupleType { entries }) => {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].name, "u");
            assert_eq!(entries[0].ty, types.int_type());
            assert_eq!(entries[1].name, "v");
            assert_eq!(entries[1].ty, types.float_type());
        }
        other => panic!("expected a named tuple, got {other}"),
    }
}

#[test]
fn class_and_enum_variant_calls_instantiate() {
    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://instantiation.rill", "demo");

    let class = b.class("C", DeclFlags::empty(), vec![], vec![], vec![], vec![]);
    let class_ref = b.node_ref(class);
    let variant = b.enum_variant("V", vec![]);
    let variant_ref = b.node_ref(variant);
    let enum_decl = b.enum_decl("E", DeclFlags::empty(), vec![variant]);
    let enum_ref = b.node_ref(enum_decl);

    let class_call = {
        let callee = b.reference("C", Some(class_ref));
        b.call(callee, vec![], vec![])
    };
    let variant_call = {
        let enum_reference = b.reference("E", Some(enum_ref));
        let member = b.reference("V", Some(variant_ref));
        let access = b.member_access(enum_reference, member, false);
        b.call(access, vec![], vec![])
    };

    let statements = vec![class_call, variant_call]
        .into_iter()
        .map(|expression| b.expression_statement(expression))
        .collect();
    let block = b.block(statements);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    let class_call = b.node_ref(class_call);
    let variant_call = b.node_ref(variant_call);
    workspace.insert(b.finish(vec![class, enum_decl, pipeline]));
    let services = services(workspace);
    let types = services.types();

    assert_eq!(types.compute_type(class_call), types.compute_type(class_ref));
    assert_eq!(types.compute_type(variant_call), types.compute_type(variant_ref));
}

#[test]
fn null_safe_member_access_on_nullable_receiver_is_nullable() {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let mut b = builder(&workspace, "memory://member-access.rill", "demo");

    let attribute_type = b.named_type("Int", Some(int_class), false);
    let attribute = b.attribute("a", DeclFlags::empty(), Some(attribute_type));
    let attribute_ref = b.node_ref(attribute);
    let class = b.class("C", DeclFlags::empty(), vec![], vec![], vec![], vec![attribute]);
    let class_ref = b.node_ref(class);

    let parameter_type = b.named_type("C", Some(class_ref), true);
    let parameter = b.parameter("c", Some(parameter_type), None);
    let parameter_ref = b.node_ref(parameter);

    let null_safe = {
        let receiver = b.reference("c", Some(parameter_ref));
        let member = b.reference("a", Some(attribute_ref));
        b.member_access(receiver, member, true)
    };
    let plain = {
        let receiver = b.reference("c", Some(parameter_ref));
        let member = b.reference("a", Some(attribute_ref));
        b.member_access(receiver, member, false)
    };

    let statements = vec![null_safe, plain]
        .into_iter()
        .map(|expression| b.expression_statement(expression))
        .collect();
    let block = b.block(statements);
    let segment = b.segment("s", DeclFlags::empty(), vec![parameter], vec![], block);

    let null_safe = b.node_ref(null_safe);
    let plain = b.node_ref(plain);
    workspace.insert(b.finish(vec![class, segment]));
    let services = services(workspace);
    let types = services.types();

    assert_eq!(
        types.compute_type(null_safe),
        types.int_type().with_explicit_nullability(true)
    );
    assert_eq!(types.compute_type(plain), types.int_type());
}

#[test]
fn named_type_nullability_marker_overrides() {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let mut b = builder(&workspace, "memory://named-types.rill", "demo");

    let nullable_int = b.named_type("Int", Some(int_class), true);
    let parameter = b.parameter("p", Some(nullable_int), None);
    let parameter_ref = b.node_ref(parameter);
    let block = b.block(vec![]);
    let segment = b.segment("s", DeclFlags::empty(), vec![parameter], vec![], block);

    workspace.insert(b.finish(vec![segment]));
    let services = services(workspace);
    let types = services.types();

    assert_eq!(
        types.compute_type(parameter_ref),
        types.int_type().with_explicit_nullability(true)
    );
}

#[test]
fn lambda_parameters_infer_from_the_annotated_parameter() {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let mut b = builder(&workspace, "memory://lambda-inference.rill", "demo");

    // fun apply(op: (x: Int) -> (r: Int))
    let x_type = b.named_type("Int", Some(int_class), false);
    let x = b.parameter("x", Some(x_type), None);
    let r_type = b.named_type("Int", Some(int_class), false);
    let r = b.result("r", Some(r_type));
    let op_type = b.callable_type(vec![x], vec![r]);
    let op = b.parameter("op", Some(op_type), None);
    let apply = b.function("apply", DeclFlags::empty(), vec![], vec![op], vec![], PurityAnnotation::Pure);
    let apply_ref = b.node_ref(apply);

    // apply((y) -> y)
    let y = b.parameter("y", None, None);
    let y_ref = b.node_ref(y);
    let body = b.reference("y", Some(y_ref));
    let lambda = b.expression_lambda(vec![y], body);
    let argument = b.argument(lambda);
    let callee = b.reference("apply", Some(apply_ref));
    let call = b.call(callee, vec![], vec![argument]);

    let statement = b.expression_statement(call);
    let block = b.block(vec![statement]);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    workspace.insert(b.finish(vec![apply, pipeline]));
    let services = services(workspace);
    let types = services.types();

    assert_eq!(types.compute_type(y_ref), types.int_type());
}

#[test]
fn unresolved_references_yield_unknown() {
    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://unresolved.rill", "demo");

    let dangling = b.reference("missing", None);
    let statement = b.expression_statement(dangling);
    let block = b.block(vec![statement]);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    let dangling = b.node_ref(dangling);
    workspace.insert(b.finish(vec![pipeline]));
    let services = services(workspace);

    assert_eq!(services.types().compute_type(dangling), Type::Unknown);
}

#[test]
fn generic_class_type_arguments_substitute() {
    let mut workspace = Workspace::new();
    let int_class = workspace.builtins().int_class;
    let list_class = workspace.builtins().list_class;
    let mut b = builder(&workspace, "memory://generics.rill", "demo");

    // p: List<Int>
    let int_type_node = b.named_type("Int", Some(int_class), false);
    let type_argument = b.type_argument(int_type_node);
    let list_type_node = b.named_type_with_args("List", Some(list_class), vec![type_argument], false);
    let parameter = b.parameter("p", Some(list_type_node), None);
    let parameter_ref = b.node_ref(parameter);
    let block = b.block(vec![]);
    let segment = b.segment("s", DeclFlags::empty(), vec![parameter], vec![], block);

    workspace.insert(b.finish(vec![segment]));
    let services = services(workspace);
    let types = services.types();

    assert_eq!(
        types.compute_type(parameter_ref),
        types.list_type(types.int_type())
    );
}

#[test]
fn exceeded_recursion_limits_degrade_to_unknown() {
    use rill_common::RecursionProfile;
    use rill_sema::{SemanticServices, SemanticSettings};
    use std::sync::Arc;

    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://deep.rill", "demo");

    // ((((((1)))))) — deeper than the tiny depth limit below.
    let mut expression = b.int_lit(1);
    for _ in 0..8 {
        expression = b.parenthesized(expression);
    }
    let statement = b.expression_statement(expression);
    let block = b.block(vec![statement]);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    let expression = b.node_ref(expression);
    workspace.insert(b.finish(vec![pipeline]));

    let settings = SemanticSettings {
        type_inference: RecursionProfile::Custom {
            max_depth: 4,
            max_iterations: 100,
        },
        ..SemanticSettings::default()
    };
    let services = SemanticServices::with_settings(Arc::new(workspace), settings);

    // The guard trips and the engine answers with the sentinel instead of
    // overflowing.
    assert_eq!(services.types().compute_type(expression), Type::Unknown);
}

#[test]
fn invalidation_recomputes_after_reparse() {
    let mut workspace = Workspace::new();
    let mut b = builder(&workspace, "memory://invalidate.rill", "demo");

    let literal = b.int_lit(1);
    let statement = b.expression_statement(literal);
    let block = b.block(vec![statement]);
    let pipeline = b.pipeline("main", DeclFlags::empty(), block);

    let literal = b.node_ref(literal);
    let document = b.finish(vec![pipeline]);
    let document_id = document.id;
    workspace.insert(document);
    let services = services(workspace);
    let types = services.types();

    assert_eq!(types.compute_type(literal), types.int_type());
    // A reparse drops the memo; the analysis still answers afterwards.
    services.invalidate_document(document_id);
    assert_eq!(types.compute_type(literal), types.int_type());
}
