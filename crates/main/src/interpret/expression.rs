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
    any::Any,
    fmt::{Debug, Formatter},
    marker::PhantomData,
    sync::Arc,
};

use crate::{
    interpret::assembly::Assembly,
    profile::NamedSource,
    runtime::{RuntimeCause, RuntimeError, RuntimeResult, TypeName, TypeRegistry, Value},
    semantics::Analysis,
    syntax::ExpressionMode,
};

/// An immutable executable form of a compiled expression.
///
/// The artifact does not depend on the compiler's state, and it can be
/// evaluated from any number of threads at the same time.
///
/// The [ExpressionEngine](crate::engine::ExpressionEngine) returns artifacts
/// from its cache wrapped into [CompiledExpression] objects, or as is from the
/// [compile_dyn](crate::engine::ExpressionEngine::compile_dyn) function.
pub struct ExpressionArtifact {
    source: NamedSource,
    header: Option<NamedSource>,
    context: TypeName,
    result: TypeName,
    mode: ExpressionMode,
    assembly: Assembly,
    registry: Arc<TypeRegistry>,
}

impl Debug for ExpressionArtifact {
    #[inline]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ExpressionArtifact")
            .field("source", &self.source.name)
            .field("context", &self.context)
            .field("result", &self.result)
            .field("mode", &self.mode)
            .field("assembly", &self.assembly)
            .finish()
    }
}

impl ExpressionArtifact {
    pub(crate) fn new(
        registry: Arc<TypeRegistry>,
        source: NamedSource,
        header: Option<NamedSource>,
        (context, result): (TypeName, TypeName),
        mode: ExpressionMode,
        analysis: &Analysis,
    ) -> Self {
        let assembly = Assembly::compile(&registry, analysis);

        Self {
            source,
            header,
            context,
            result,
            mode,
            assembly,
            registry,
        }
    }

    /// The source code the artifact was compiled from.
    #[inline(always)]
    pub fn source(&self) -> &NamedSource {
        &self.source
    }

    #[inline(always)]
    pub fn context_type(&self) -> &TypeName {
        &self.context
    }

    #[inline(always)]
    pub fn result_type(&self) -> &TypeName {
        &self.result
    }

    #[inline(always)]
    pub fn mode(&self) -> ExpressionMode {
        self.mode
    }

    /// Evaluates the expression against the `context` value.
    ///
    /// The `context` must be a value of the artifact's context type or of its
    /// subtype. The returned value is of the artifact's result type.
    pub fn evaluate(&self, context: Value) -> RuntimeResult<Value> {
        let actual = context.type_name();

        if actual != self.context && !self.registry.is_subtype(&actual, &self.context) {
            return Err(RuntimeError {
                expression: self.source.clone(),
                span: 0..self.source.code.chars().count(),
                cause: RuntimeCause::Context {
                    expected: self.context.clone(),
                },
            });
        }

        self.assembly
            .execute(&self.registry, &context)
            .map_err(|(cmd, cause)| {
                let expression = match (self.assembly.is_header(cmd), &self.header) {
                    (true, Some(header)) => header.clone(),
                    _ => self.source.clone(),
                };

                RuntimeError {
                    expression,
                    span: self.assembly.span(cmd),
                    cause,
                }
            })
    }
}

/// A compiled expression that maps values of the context type `C` to values
/// of the result type `R`.
///
/// The object is a cheap to clone shared reference to the cached
/// [ExpressionArtifact]. Repeated compilations of the same expression under
/// the same Profile return references to the same artifact, which can be
/// checked with [ptr_eq](Self::ptr_eq).
pub struct CompiledExpression<C, R> {
    artifact: Arc<ExpressionArtifact>,
    marker: PhantomData<fn(C) -> R>,
}

impl<C, R> Clone for CompiledExpression<C, R> {
    #[inline(always)]
    fn clone(&self) -> Self {
        Self {
            artifact: self.artifact.clone(),
            marker: PhantomData,
        }
    }
}

impl<C, R> Debug for CompiledExpression<C, R> {
    #[inline(always)]
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self.artifact.as_ref(), formatter)
    }
}

impl<C, R> CompiledExpression<C, R> {
    #[inline(always)]
    pub(crate) fn new(artifact: Arc<ExpressionArtifact>) -> Self {
        Self {
            artifact,
            marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn artifact(&self) -> &Arc<ExpressionArtifact> {
        &self.artifact
    }

    #[inline(always)]
    pub fn source(&self) -> &NamedSource {
        self.artifact.source()
    }

    /// Returns true if both objects refer to the same artifact.
    #[inline(always)]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.artifact, &other.artifact)
    }
}

impl<C, R> CompiledExpression<C, R>
where
    C: Any + Send + Sync,
    R: Any + Clone,
{
    /// Evaluates the expression against the `context` value.
    pub fn apply(&self, context: C) -> RuntimeResult<R> {
        let artifact = self.artifact.as_ref();

        let value = artifact.evaluate(Value::from_rust(context, &artifact.context))?;

        let actual = value.type_name();

        match value.into_rust::<R>() {
            Some(result) => Ok(result),

            None => Err(RuntimeError {
                expression: artifact.source.clone(),
                span: 0..artifact.source.code.chars().count(),
                cause: RuntimeCause::Result { actual },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        interpret::ExpressionArtifact,
        profile::{NamedSource, Profile},
        runtime::{RuntimeCause, RuntimeResult, TypeName, TypeRegistry, Value},
        semantics::{analyze, Request},
        syntax::{ExpressionMode, TemplateSyntax, MAX_DEPTH},
    };

    fn artifact(header: Option<&str>, code: &str, result: &str) -> ExpressionArtifact {
        let registry = Arc::new(TypeRegistry::new());

        let profile = Profile::build(
            "test",
            &NamedSource::new("syntax", "default allow;"),
            &NamedSource::new("symbols", "allow *.*;"),
            &NamedSource::new("attributes", ""),
            header.map(|code| NamedSource::new("header", code)),
        )
        .unwrap();

        let source = NamedSource::new("test", code);
        let context = TypeName::int();
        let result = TypeName::new(result);

        let analysis = analyze(&Request {
            registry: &registry,
            profile: &profile,
            source: &source,
            context: &context,
            result: &result,
            mode: ExpressionMode::Plain,
            template: &TemplateSyntax::new(),
            max_depth: MAX_DEPTH,
        })
        .unwrap();

        ExpressionArtifact::new(
            registry,
            source,
            profile.header_source().cloned(),
            (context, result),
            ExpressionMode::Plain,
            &analysis,
        )
    }

    fn eval(code: &str, result: &str) -> RuntimeResult<Value> {
        artifact(None, code, result).evaluate(Value::Int(5))
    }

    #[test]
    fn test_evaluation() {
        assert_eq!(eval("1 + 2 * 3", "int").unwrap(), Value::Int(7));
        assert_eq!(eval("context * 2 - 1", "int").unwrap(), Value::Int(9));
        assert_eq!(eval("7 / 2 + 0.5", "double").unwrap(), Value::Double(3.5));
        assert_eq!(eval("7 % 4", "double").unwrap(), Value::Double(3.0));
        assert_eq!(eval("-context", "int").unwrap(), Value::Int(-5));
        assert_eq!(eval("!(1 < 2)", "bool").unwrap(), Value::Bool(false));
        assert_eq!(eval("\"b\" > \"a\"", "bool").unwrap(), Value::Bool(true));
        assert_eq!(eval("1 == 1.0", "bool").unwrap(), Value::Bool(true));
        assert_eq!(eval("\"x\" + 1 + true", "string").unwrap(), Value::from("x1true"));
        assert_eq!(eval("\"abc\".length + 1", "int").unwrap(), Value::Int(4));
        assert_eq!(eval("1 + 2", "void").unwrap(), Value::Void);

        assert_eq!(
            eval("if (context > 3) \"big\" else \"small\"", "string").unwrap(),
            Value::from("big"),
        );

        assert_eq!(
            eval("if (context > 3) 1 else 0.5", "double").unwrap(),
            Value::Double(1.0),
        );

        assert_eq!(
            eval(
                "{ var i = 0; var s = 0; while (i < context) { s = s + i; i = i + 1; }; s }",
                "int",
            )
            .unwrap(),
            Value::Int(10),
        );
    }

    #[test]
    fn test_short_circuit() {
        assert_eq!(eval("false && 1 / 0 == 1", "bool").unwrap(), Value::Bool(false));
        assert_eq!(eval("true || 1 / 0 == 1", "bool").unwrap(), Value::Bool(true));
        assert_eq!(eval("true && 1 < 2", "bool").unwrap(), Value::Bool(true));
        assert_eq!(eval("false || 1 > 2", "bool").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_runtime_errors() {
        let error = eval("1 + 10 / (context - 5)", "int").unwrap_err();

        assert_eq!(error.cause, RuntimeCause::DivisionByZero);
        assert_eq!(error.span, 4..22);
        assert_eq!(error.expression.name, "test");

        let error = eval("9223372036854775807 + context", "int").unwrap_err();

        assert_eq!(
            error.cause,
            RuntimeCause::Overflow {
                operation: "addition"
            },
        );

        let error = artifact(Some("val d = 10 / context;"), "d", "int")
            .evaluate(Value::Int(0))
            .unwrap_err();

        assert_eq!(error.expression.name, "header");
        assert_eq!(error.span, 8..20);

        let error = artifact(None, "1", "int")
            .evaluate(Value::from("text"))
            .unwrap_err();

        assert_eq!(
            error.cause,
            RuntimeCause::Context {
                expected: TypeName::int()
            },
        );
    }
}
