mod common;

use common::{analyze, binding_named, bindings_named, type_of};
use pyscope_core::BindingKind;

#[test]
fn literal_assignment_binds_variable() {
    let analyzer = analyze(&[("/proj/m.py", "x = 1\n")]);

    let binding = binding_named(&analyzer, "x");
    assert_eq!(binding.kind, BindingKind::Variable);
    assert_eq!(type_of(&analyzer, "x"), "int");

    // The definition node maps back to its binding.
    let refs = analyzer.references().get(&binding.node).expect("definition reference");
    assert_eq!(refs.len(), 1);
}

#[test]
fn reassignment_widens_one_binding() {
    let analyzer = analyze(&[("/proj/m.py", "x = 1\nx = \"s\"\n")]);

    // One entry, union-typed, not two bindings.
    assert_eq!(bindings_named(&analyzer, "x").len(), 1);
    assert_eq!(type_of(&analyzer, "x"), "Union[int, str]");
}

#[test]
fn call_shapes_widen_the_return_type() {
    let mut analyzer = analyze(&[("/proj/m.py", "def f(a):\n    return a\nf(1)\nf(\"s\")\n")]);
    analyzer.finish();

    let binding = binding_named(&analyzer, "f");
    let fun = analyzer.type_store().as_fun(binding.ty).expect("function type");
    assert_eq!(analyzer.type_store().describe(fun.ret), "Union[int, str]");
    assert_eq!(analyzer.called_functions(), 2);
    assert_eq!(analyzer.uncalled_count(), 0);
}

#[test]
fn self_recursion_terminates_with_unknown() {
    let mut analyzer = analyze(&[("/proj/m.py", "def f(x):\n    return f(x)\n")]);
    analyzer.finish();

    let binding = binding_named(&analyzer, "f");
    let fun = analyzer.type_store().as_fun(binding.ty).expect("function type");
    assert_eq!(analyzer.type_store().describe(fun.ret), "?");
    assert_eq!(analyzer.uncalled_count(), 0);
}

#[test]
fn growing_argument_recursion_terminates() {
    let mut analyzer = analyze(&[("/proj/m.py", "def f(x):\n    return f([x])\n")]);
    analyzer.finish();
    assert_eq!(analyzer.uncalled_count(), 0);
}

#[test]
fn mutual_recursion_resolves_to_the_concrete_type() {
    let source = "def even(n):\n    if n == 0:\n        return True\n    return odd(n - 1)\n\
                  def odd(n):\n    if n == 0:\n        return False\n    return even(n - 1)\n\
                  r = even(4)\n";
    let mut analyzer = analyze(&[("/proj/m.py", source)]);
    analyzer.finish();
    assert_eq!(type_of(&analyzer, "r"), "bool");
}

#[test]
fn method_call_binds_self_type() {
    let source = "class C:\n    def m(self):\n        return self\nc = C().m()\n";
    let analyzer = analyze(&[("/proj/m.py", source)]);

    // The call expression's type is the instance.
    assert_eq!(type_of(&analyzer, "c"), "C");

    let method = binding_named(&analyzer, "m");
    assert_eq!(method.kind, BindingKind::Method);
    let fun = analyzer.type_store().as_fun(method.ty).expect("method type");
    let self_type = fun.self_type.expect("bound self type");
    assert_eq!(analyzer.type_store().describe(self_type), "C");
}

#[test]
fn constructor_assigns_instance_attributes() {
    let source = "class C:\n    def __init__(self):\n        self.x = 1\nc = C()\n";
    let analyzer = analyze(&[("/proj/m.py", source)]);

    assert_eq!(type_of(&analyzer, "c"), "C");
    let attr = binding_named(&analyzer, "x");
    assert_eq!(attr.kind, BindingKind::Attribute);
    assert_eq!(analyzer.type_store().describe(attr.ty), "int");
}

#[test]
fn function_without_return_yields_none() {
    let mut analyzer = analyze(&[("/proj/m.py", "def f(a):\n    a\n")]);
    analyzer.finish();

    let binding = binding_named(&analyzer, "f");
    let fun = analyzer.type_store().as_fun(binding.ty).expect("function type");
    assert_eq!(analyzer.type_store().describe(fun.ret), "None");
}

#[test]
fn conditional_assignment_widens() {
    let source = "def f(c):\n    if c:\n        r = 1\n    else:\n        r = \"s\"\n    return r\nf(True)\n";
    let analyzer = analyze(&[("/proj/m.py", source)]);

    let binding = binding_named(&analyzer, "f");
    let fun = analyzer.type_store().as_fun(binding.ty).expect("function type");
    assert_eq!(analyzer.type_store().describe(fun.ret), "Union[int, str]");
}

#[test]
fn container_literals_infer_element_types() {
    let source = "xs = [1, 2]\nd = {\"k\": 1}\nt = (1, \"s\")\n";
    let analyzer = analyze(&[("/proj/m.py", source)]);

    assert_eq!(type_of(&analyzer, "xs"), "list[int]");
    assert_eq!(type_of(&analyzer, "d"), "dict[str, int]");
    assert_eq!(type_of(&analyzer, "t"), "tuple[int, str]");
}

#[test]
fn tuple_destructuring_assigns_positionally() {
    let analyzer = analyze(&[("/proj/m.py", "a, b = (1, \"s\")\n")]);
    assert_eq!(type_of(&analyzer, "a"), "int");
    assert_eq!(type_of(&analyzer, "b"), "str");
}

#[test]
fn for_loop_binds_element_type() {
    let analyzer = analyze(&[("/proj/m.py", "total = 0\nfor n in [1, 2, 3]:\n    total = total + n\n")]);
    assert_eq!(type_of(&analyzer, "n"), "int");
    assert_eq!(type_of(&analyzer, "total"), "int");
}

#[test]
fn arithmetic_promotes_numerics() {
    let source = "i = 1 + 2\nf = 1 + 2.0\nq = 1 / 2\ns = \"a\" + \"b\"\n";
    let analyzer = analyze(&[("/proj/m.py", source)]);
    assert_eq!(type_of(&analyzer, "i"), "int");
    assert_eq!(type_of(&analyzer, "f"), "float");
    assert_eq!(type_of(&analyzer, "q"), "float");
    assert_eq!(type_of(&analyzer, "s"), "str");
}

#[test]
fn default_parameters_apply_when_missing() {
    let source = "def f(a, b=1):\n    return b\nr = f(\"x\")\n";
    let analyzer = analyze(&[("/proj/m.py", source)]);
    assert_eq!(type_of(&analyzer, "r"), "int");
}

#[test]
fn inherited_methods_resolve_through_bases() {
    let source = "class A:\n    def m(self):\n        return 1\nclass B(A):\n    pass\nr = B().m()\n";
    let analyzer = analyze(&[("/proj/m.py", source)]);
    assert_eq!(type_of(&analyzer, "r"), "int");
}

#[test]
fn comprehensions_build_container_types() {
    let source = "xs = [n for n in [1, 2]]\nd = {k: 1 for k in [\"a\"]}\n";
    let analyzer = analyze(&[("/proj/m.py", source)]);
    assert_eq!(type_of(&analyzer, "xs"), "list[int]");
    assert_eq!(type_of(&analyzer, "d"), "dict[str, int]");
}

#[test]
fn builtin_calls_return_seeded_types() {
    let source = "n = len([1])\ns = input()\n";
    let analyzer = analyze(&[("/proj/m.py", source)]);
    assert_eq!(type_of(&analyzer, "n"), "int");
    assert_eq!(type_of(&analyzer, "s"), "str");
}

#[test]
fn lambda_application_infers_body() {
    let source = "f = lambda a: a\nr = f(1)\n";
    let mut analyzer = analyze(&[("/proj/m.py", source)]);
    analyzer.finish();
    assert_eq!(type_of(&analyzer, "r"), "int");
    assert_eq!(analyzer.uncalled_count(), 0);
}
