////////////////////////////////////////////////////////////////////////////////
// This file is part of "Ad Astra", an embeddable scripting programming       //
// language platform.                                                         //
//                                                                            //
// This work is proprietary software with source-available code.              //
//                                                                            //
// To copy, use, distribute, or contribute to this work, you must agree to    //
// the terms of the General License Agreement:                                //
//                                                                            //
// https://github.com/Eliah-Lakhin/ad-astra/blob/master/EULA.md               //
//                                                                            //
// The agreement grants a Basic Commercial License, allowing you to use       //
// this work in non-commercial and limited commercial products with a total   //
// gross revenue cap. To remove this commercial limit for one of your         //
// products, you must acquire a Full Commercial License.                      //
//                                                                            //
// If you contribute to the source code, documentation, or related materials, //
// you must grant me an exclusive license to these contributions.             //
// Contributions are governed by the "Contributions" section of the General   //
// License Agreement.                                                         //
//                                                                            //
// Copying the work in parts is strictly forbidden, except as permitted       //
// under the General License Agreement.                                       //
//                                                                            //
// If you do not or cannot agree to the terms of this Agreement,              //
// do not use this work.                                                      //
//                                                                            //
// This work is provided "as is", without any warranties, express or implied, //
// except where such disclaimers are legally invalid.                         //
//                                                                            //
// Copyright (c) 2024 Ilya Lakhin (Илья Александрович Лахин).                 //
// All rights reserved.                                                       //
////////////////////////////////////////////////////////////////////////////////

use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

use crate::{
    analysis::{CompileError, CompletionError, IssueCode},
    engine::{EngineConfig, ExpressionEngine},
    profile::{NamedSource, Profile},
    runtime::{RuntimeCause, TypeName, TypeRegistry, Value},
    syntax::ExpressionMode,
};

struct Root {
    property: String,
    field: f64,
}

struct Derived {
    root: Root,
}

fn root() -> Root {
    Root {
        property: String::from("property"),
        field: 42.42,
    }
}

fn registry() -> Arc<TypeRegistry> {
    let mut registry = TypeRegistry::new();

    registry
        .register::<Root>("Root", |ty| {
            ty.doc("The root object.");

            ty.method("getProperty", TypeName::string(), |root, _| {
                Ok(Value::from(root.property.as_str()))
            });

            ty.method("isExtraordinary", TypeName::bool(), |_, _| Ok(Value::Bool(true)))
                .doc("Always true.");

            ty.field("field", TypeName::double(), |root| Value::Double(root.field));

            ty.method("twice", TypeName::int(), |_, args| {
                Ok(Value::Int(args.int(0)?.saturating_mul(2)))
            })
            .param("value", TypeName::int());

            ty.method("overriddenMethod", TypeName::int(), |_, _| Ok(Value::Int(1)));
        })
        .unwrap();

    registry
        .register::<Derived>("Derived", |ty| {
            ty.extends::<Root>(|derived| &derived.root);

            ty.method("overriddenMethod", TypeName::int(), |_, _| Ok(Value::Int(2)));

            ty.display(|derived| format!("<{}>", derived.root.property));
        })
        .unwrap();

    registry
        .library(
            "special",
            Derived {
                root: Root {
                    property: String::from("special"),
                    field: 1.0,
                },
            },
        )
        .unwrap();

    Arc::new(registry)
}

fn profile(syntax: &str, symbols: &str, attributes: &str) -> Profile {
    Profile::build(
        "test",
        &NamedSource::new("syntax", syntax),
        &NamedSource::new("symbols", symbols),
        &NamedSource::new("attributes", attributes),
        None,
    )
    .unwrap()
}

fn permissive() -> Profile {
    profile(
        "default allow;",
        "allow Root.*; allow string.*; allow int.*; allow double.*; allow bool.*;",
        "",
    )
}

#[test]
fn test_arithmetic() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = permissive();

    let expression = engine
        .compile::<Root, i64>(
            &profile,
            NamedSource::new("arithmetic", "1 + 2 * 3 - twice(4)"),
            ExpressionMode::Plain,
        )
        .unwrap();

    assert_eq!(expression.apply(root()).unwrap(), -1);

    let expression = engine
        .compile::<Root, f64>(
            &profile,
            NamedSource::new("field", "field * 2"),
            ExpressionMode::Plain,
        )
        .unwrap();

    assert_eq!(expression.apply(root()).unwrap(), 84.84);

    let expression = engine
        .compile::<Root, i64>(
            &profile,
            NamedSource::new("overflow", "9223372036854775807 + 1"),
            ExpressionMode::Plain,
        )
        .unwrap();

    let error = expression.apply(root()).unwrap_err();

    assert_eq!(
        error.cause,
        RuntimeCause::Overflow {
            operation: "addition"
        },
    );
}

#[test]
fn test_implicit_context() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = permissive();

    let expression = engine
        .compile::<Root, String>(
            &profile,
            NamedSource::new("implicit", "if (extraordinary) property else \"plain\""),
            ExpressionMode::Plain,
        )
        .unwrap();

    assert_eq!(expression.apply(root()).unwrap(), "property");
}

#[test]
fn test_template() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = permissive();

    let expression = engine
        .compile::<Root, String>(
            &profile,
            NamedSource::new("template", "temp: ${context.getProperty()}"),
            ExpressionMode::Template,
        )
        .unwrap();

    assert_eq!(expression.apply(root()).unwrap(), "temp: property");

    let expression = engine
        .compile::<Root, i64>(
            &profile,
            NamedSource::new("constant", "42"),
            ExpressionMode::Template,
        )
        .unwrap();

    assert_eq!(expression.apply(root()).unwrap(), 42);
}

#[test]
fn test_denied_symbol() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = profile("default allow;", "allow Root.getProperty; allow string.*;", "");

    let error = engine
        .compile::<Root, i64>(
            &profile,
            NamedSource::new("denied", "context.getProperty().length + twice(1)"),
            ExpressionMode::Plain,
        )
        .unwrap_err();

    let CompileError::SymbolValidation { source, denied } = &error else {
        panic!("Unexpected error: {error}");
    };

    assert_eq!(source.name, "denied");
    assert_eq!(denied.len(), 1);
    assert_eq!(denied[0].member, "twice");
    assert_eq!(denied[0].signature, "twice(int)");
    assert_eq!(denied[0].span, 31..39);
    assert_eq!(error.diagnostics()[0].code, IssueCode::DeniedSymbol);
}

#[test]
fn test_validator_precedence() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = profile(
        "default allow;",
        "allow Root.*; deny =Root.overriddenMethod;",
        "",
    );

    assert!(matches!(
        engine.compile::<Root, i64>(
            &profile,
            NamedSource::new("root", "overriddenMethod()"),
            ExpressionMode::Plain,
        ),
        Err(CompileError::SymbolValidation { .. }),
    ));

    let expression = engine
        .compile::<Derived, i64>(
            &profile,
            NamedSource::new("derived", "overriddenMethod() + twice(1)"),
            ExpressionMode::Plain,
        )
        .unwrap();

    assert_eq!(expression.apply(Derived { root: root() }).unwrap(), 4);
}

#[test]
fn test_syntax_rejection() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = profile(
        "default allow; deny binary(%);",
        "allow Root.*;",
        "",
    );

    let error = engine
        .compile::<Root, i64>(
            &profile,
            NamedSource::new("syntax", "twice(5) % 3"),
            ExpressionMode::Plain,
        )
        .unwrap_err();

    let CompileError::Syntax { issues, .. } = &error else {
        panic!("Unexpected error: {error}");
    };

    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].code, IssueCode::ForbiddenSyntax);
    assert_eq!(issues[0].span, 0..12);

    assert!(matches!(
        engine.compile::<Root, i64>(
            &profile,
            NamedSource::new("parse", "twice(5"),
            ExpressionMode::Plain,
        ),
        Err(CompileError::Syntax { .. }),
    ));
}

#[test]
fn test_completion() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = profile(
        "default allow;",
        "allow Root.{getProperty, isExtraordinary};",
        "Root.getProperty { doc \"Returns the property.\"; }",
    );

    let completer = engine
        .completer::<Root, bool>(&profile, ExpressionMode::Plain)
        .unwrap();

    let items = completer.get_type_completion("context.", 8).unwrap();

    assert_eq!(
        items
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>(),
        vec!["getProperty", "isExtraordinary"],
    );

    assert_eq!(
        items[0].documentation.as_deref(),
        Some("Returns the property.")
    );
    assert_eq!(items[1].documentation.as_deref(), Some("Always true."));
    assert_eq!(items[0].return_type, TypeName::string());

    assert_eq!(
        completer.get_type_completion("context.", 9),
        Err(CompletionError::Cursor(9)),
    );

    let completions = completer.complete("context.", 8).unwrap();

    assert_eq!(completer.result_type(), &TypeName::bool());
    assert_eq!(completions.result, TypeName::bool());
    assert_eq!(completions.ranked()[0].name, "isExtraordinary");
    assert!(completions.ranked()[0].assignable);
    assert!(!completions.ranked()[1].assignable);
}

#[test]
fn test_idempotence() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = permissive();

    let compile = |code: &str| {
        engine
            .compile::<Root, i64>(&profile, NamedSource::new("twice", code), ExpressionMode::Plain)
            .unwrap()
    };

    let first = compile("twice(21)");
    let second = compile("twice(21)");
    let third = compile("twice(22)");

    assert!(first.ptr_eq(&second));
    assert!(!first.ptr_eq(&third));
    assert_eq!(engine.compilations(), 2);
    assert_eq!(engine.cached(), 2);

    let error = engine
        .compile::<Root, i64>(&profile, NamedSource::new("broken", "1 +"), ExpressionMode::Plain)
        .unwrap_err();

    let repeated = engine
        .compile::<Root, i64>(&profile, NamedSource::new("broken", "1 +"), ExpressionMode::Plain)
        .unwrap_err();

    assert_eq!(error, repeated);
    assert_eq!(engine.compilations(), 3);
}

#[test]
fn test_single_flight() {
    const THREADS: usize = 8;

    let engine = ExpressionEngine::new(registry(), EngineConfig::new());
    let profile = permissive();
    let barrier = Barrier::new(THREADS);

    let expressions = scope(|scope| {
        let handles = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    let _ = barrier.wait();

                    engine
                        .compile::<Root, String>(
                            &profile,
                            NamedSource::new("shared", "property + \" \" + field"),
                            ExpressionMode::Plain,
                        )
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });

    assert_eq!(engine.compilations(), 1);

    for expression in &expressions {
        assert!(expression.ptr_eq(&expressions[0]));
    }

    assert_eq!(expressions[0].apply(root()).unwrap(), "property 42.42");
}

#[test]
fn test_deadline() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = permissive();

    let error = engine
        .compile_with_deadline::<Root, i64>(
            &profile,
            NamedSource::new("late", "twice(1)"),
            ExpressionMode::Plain,
            Instant::now(),
        )
        .unwrap_err();

    assert!(matches!(error, CompileError::Timeout { .. }));
    assert_eq!(engine.cached(), 0);

    let expression = engine
        .compile::<Root, i64>(&profile, NamedSource::new("late", "twice(1)"), ExpressionMode::Plain)
        .unwrap();

    assert_eq!(expression.apply(root()).unwrap(), 2);
    assert_eq!(engine.compilations(), 2);
    assert_eq!(engine.cached(), 1);
}

#[test]
fn test_unregistered_types() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());

    let error = engine
        .compile::<u8, i64>(&permissive(), NamedSource::new("unknown", "1"), ExpressionMode::Plain)
        .unwrap_err();

    assert_eq!(error.diagnostics()[0].code, IssueCode::UnknownType);
    assert!(engine
        .completer::<u8, bool>(&permissive(), ExpressionMode::Plain)
        .is_none());
}

#[test]
fn test_subtype_values() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = permissive();

    let compile = |code: &str| {
        engine
            .compile_dyn(
                &profile,
                NamedSource::new("subtype", code),
                TypeName::new("Root"),
                TypeName::string(),
                ExpressionMode::Plain,
            )
            .unwrap()
    };

    let derived = || Value::object("Derived", Derived { root: root() });

    assert_eq!(
        compile("getProperty() + \"!\"").evaluate(derived()).unwrap(),
        Value::from("property!"),
    );

    assert_eq!(
        compile("{ var r = context; r = special; r.getProperty() }")
            .evaluate(Value::object("Root", root()))
            .unwrap(),
        Value::from("special"),
    );

    let unified = compile("(if (isExtraordinary()) special else context).getProperty()");

    assert_eq!(
        unified.evaluate(Value::object("Root", root())).unwrap(),
        Value::from("special"),
    );
    assert_eq!(unified.evaluate(derived()).unwrap(), Value::from("special"));
}

#[test]
fn test_library_global() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());

    let allowed = profile("default allow;", "allow Root.*; allow string.*;", "");
    let denied = profile(
        "default allow;",
        "allow Root.*; allow string.*; deny Derived.getProperty;",
        "",
    );

    let expression = engine
        .compile::<Root, String>(
            &allowed,
            NamedSource::new("global", "special.getProperty() + \"/\" + getProperty()"),
            ExpressionMode::Plain,
        )
        .unwrap();

    assert_eq!(expression.apply(root()).unwrap(), "special/property");

    let error = engine
        .compile::<Root, String>(
            &denied,
            NamedSource::new("global", "special.getProperty() + \"/\" + getProperty()"),
            ExpressionMode::Plain,
        )
        .unwrap_err();

    let CompileError::SymbolValidation { denied: symbols, .. } = &error else {
        panic!("Unexpected error: {error}");
    };

    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].member, "getProperty");
    assert_eq!(symbols[0].receiver, TypeName::new("Derived"));
    assert_eq!(symbols[0].span, 0..21);

    let names = |profile: &Profile| {
        engine
            .completer::<Root, String>(profile, ExpressionMode::Plain)
            .unwrap()
            .complete("special.", 8)
            .unwrap()
            .items
            .into_iter()
            .map(|item| item.name.to_string())
            .collect::<Vec<_>>()
    };

    assert!(names(&allowed).contains(&String::from("getProperty")));
    assert!(!names(&denied).contains(&String::from("getProperty")));
    assert!(names(&denied).contains(&String::from("isExtraordinary")));
}

#[test]
fn test_host_return_type() {
    struct Faulty;

    let mut registry = TypeRegistry::new();

    registry
        .register::<Faulty>("Faulty", |ty| {
            ty.method("count", TypeName::int(), |_, _| Ok(Value::from("many")));
        })
        .unwrap();

    let engine = ExpressionEngine::new(Arc::new(registry), EngineConfig::single_thread());

    let expression = engine
        .compile::<Faulty, i64>(
            &profile("default allow;", "allow Faulty.*;", ""),
            NamedSource::new("faulty", "count() + 1"),
            ExpressionMode::Plain,
        )
        .unwrap();

    let error = expression.apply(Faulty).unwrap_err();

    assert_eq!(
        error.cause,
        RuntimeCause::ReturnType {
            member: String::from("count()"),
            expected: TypeName::int(),
            actual: TypeName::string(),
        },
    );
    assert_eq!(error.span.start, 0);
}

#[test]
fn test_display_hook_concatenation() {
    let engine = ExpressionEngine::new(registry(), EngineConfig::single_thread());
    let profile = profile("default allow;", "allow Root.getProperty;", "");

    let expression = engine
        .compile::<Derived, String>(
            &profile,
            NamedSource::new("display", "\"value: \" + context"),
            ExpressionMode::Plain,
        )
        .unwrap();

    assert_eq!(expression.apply(Derived { root: root() }).unwrap(), "value: <property>");

    let expression = engine
        .compile::<Derived, String>(
            &profile,
            NamedSource::new("template", "${context} and ${special}"),
            ExpressionMode::Template,
        )
        .unwrap();

    assert_eq!(
        expression.apply(Derived { root: root() }).unwrap(),
        "<property> and <special>",
    );
}

#[test]
fn test_nesting_limit() {
    let mut config = EngineConfig::single_thread();

    config.max_depth = 4;

    let engine = ExpressionEngine::new(registry(), config);
    let profile = permissive();

    let compile = |name: &str, code: &str| {
        engine.compile::<Root, i64>(&profile, NamedSource::new(name, code), ExpressionMode::Plain)
    };

    assert_eq!(compile("shallow", "((1))").unwrap().apply(root()).unwrap(), 1);

    let error = compile("deep", "((((((((1))))))))").unwrap_err();

    assert!(matches!(error, CompileError::Syntax { .. }));
    assert_eq!(error.diagnostics()[0].code, IssueCode::DepthLimit);

    let error = ExpressionEngine::new(registry(), EngineConfig::single_thread())
        .compile::<Root, i64>(
            &profile,
            NamedSource::new("huge", format!("{}1{}", "(".repeat(5000), ")".repeat(5000))),
            ExpressionMode::Plain,
        )
        .unwrap_err();

    assert_eq!(error.diagnostics()[0].code, IssueCode::DepthLimit);
}
