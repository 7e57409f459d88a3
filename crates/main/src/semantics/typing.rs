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

use compact_str::{format_compact, CompactString};
use lady_deirdre::lexis::SiteSpan;

use crate::{
    analysis::{suggest, Diagnostic, IssueCode, TypeIssue},
    runtime::{MemberKind, Symbol, TypeName, TypeRegistry},
    semantics::tree::{Typed, TypedKind},
    syntax::{BinaryOp, Definition, Expr, ExprKind, Name, UnaryOp},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Conversion {
    Exact,
    Upcast,
    Widen,
    Discard,
}

fn conversion(registry: &TypeRegistry, from: &TypeName, to: &TypeName) -> Option<Conversion> {
    if from == to {
        return Some(Conversion::Exact);
    }

    if to.is_void() {
        return Some(Conversion::Discard);
    }

    if from == &TypeName::int() && to == &TypeName::double() {
        return Some(Conversion::Widen);
    }

    if registry.is_subtype(from, to) {
        return Some(Conversion::Upcast);
    }

    None
}

/// Returns true if the values of the `from` type are implicitly convertible
/// to the `to` type.
#[inline(always)]
pub(crate) fn is_assignable(registry: &TypeRegistry, from: &TypeName, to: &TypeName) -> bool {
    conversion(registry, from, to).is_some()
}

struct Local {
    name: CompactString,
    slot: usize,
    ty: TypeName,
    mutable: bool,
}

/// Resolves names and checks types of the expression syntax trees.
///
/// The checker keeps going after an issue to report as many issues as
/// possible. A `None` result means that at least one issue was reported for
/// the node or its children.
pub(crate) struct Checker<'a> {
    registry: &'a TypeRegistry,
    context: TypeName,
    scopes: Vec<Vec<Local>>,
    slots: usize,
    issues: Vec<TypeIssue>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(registry: &'a TypeRegistry, context: TypeName) -> Self {
        Self {
            registry,
            context,
            scopes: vec![Vec::new()],
            slots: 0,
            issues: Vec::new(),
        }
    }

    /// The number of local variable slots allocated so far.
    #[inline(always)]
    pub(crate) fn frame(&self) -> usize {
        self.slots
    }

    #[inline(always)]
    pub(crate) fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    #[inline(always)]
    pub(crate) fn into_issues(self) -> Vec<TypeIssue> {
        self.issues
    }

    /// Checks the header definitions and declares them in the outermost
    /// scope.
    pub(crate) fn check_definitions(&mut self, definitions: &[Definition]) -> Vec<Typed> {
        let mut result = Vec::with_capacity(definitions.len());

        for definition in definitions {
            let Some(value) = self.check(&definition.value) else {
                continue;
            };

            if let Some(typed) = self.define(
                definition.span.clone(),
                definition.mutable,
                &definition.name,
                value,
            ) {
                result.push(typed);
            }
        }

        result
    }

    pub(crate) fn check(&mut self, expr: &Expr) -> Option<Typed> {
        let span = expr.span.clone();

        match &expr.kind {
            ExprKind::Int(value) => Some(Typed::new(span, TypeName::int(), TypedKind::Int(*value))),

            ExprKind::Float(value) => Some(Typed::new(
                span,
                TypeName::double(),
                TypedKind::Double(*value),
            )),

            ExprKind::String(value) => Some(Typed::new(
                span,
                TypeName::string(),
                TypedKind::String(value.clone()),
            )),

            ExprKind::Bool(value) => {
                Some(Typed::new(span, TypeName::bool(), TypedKind::Bool(*value)))
            }

            ExprKind::Context => Some(Typed::new(span, self.context.clone(), TypedKind::Context)),

            ExprKind::Ident(name) => self.ident(span, name),

            ExprKind::Select { receiver, member } => {
                let receiver = self.check(receiver)?;

                self.select(span, receiver, member, false)
            }

            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                let (receiver, implicit) = match receiver {
                    Some(receiver) => (self.check(receiver), false),

                    None => (
                        Some(Typed::new(
                            method.span.clone(),
                            self.context.clone(),
                            TypedKind::Context,
                        )),
                        true,
                    ),
                };

                let args = args.iter().map(|arg| self.check(arg)).collect::<Vec<_>>();

                let receiver = receiver?;
                let args = args.into_iter().collect::<Option<Vec<_>>>()?;

                self.call(span, receiver, method, args, implicit)
            }

            ExprKind::Unary { op, operand } => {
                let operand = self.check(operand)?;

                self.unary(span, *op, operand)
            }

            ExprKind::Binary { op, left, right } => {
                let left = self.check(left);
                let right = self.check(right);

                self.binary(span, *op, left?, right?)
            }

            ExprKind::If {
                condition,
                then,
                otherwise,
            } => {
                let condition = self
                    .check(condition)
                    .and_then(|condition| self.coerce_exact(condition, &TypeName::bool()));

                let then = self.check(then);

                let otherwise = match otherwise {
                    Some(otherwise) => Some(self.check(otherwise)),
                    None => None,
                };

                let condition = Box::new(condition?);
                let then = then?;

                let Some(otherwise) = otherwise else {
                    return Some(Typed::new(
                        span,
                        TypeName::void(),
                        TypedKind::If {
                            condition,
                            then: Box::new(then.discard_value()),
                            otherwise: None,
                        },
                    ));
                };

                let (then, otherwise, ty) = self.unify(then, otherwise?);

                Some(Typed::new(
                    span,
                    ty,
                    TypedKind::If {
                        condition,
                        then: Box::new(then),
                        otherwise: Some(Box::new(otherwise)),
                    },
                ))
            }

            ExprKind::Block { statements } => {
                self.scopes.push(Vec::new());

                let statements = statements
                    .iter()
                    .map(|statement| self.check(statement))
                    .collect::<Vec<_>>();

                let _ = self.scopes.pop();

                let statements = statements.into_iter().collect::<Option<Vec<_>>>()?;

                let ty = match statements.last() {
                    Some(last) => last.ty.clone(),
                    None => TypeName::void(),
                };

                Some(Typed::new(span, ty, TypedKind::Block(statements)))
            }

            ExprKind::Define {
                mutable,
                name,
                value,
            } => {
                let value = self.check(value)?;

                self.define(span, *mutable, name, value)
            }

            ExprKind::Assign { target, value } => {
                let value = self.check(value)?;

                self.assign(span, target, value)
            }

            ExprKind::While { condition, body } => {
                let condition = self
                    .check(condition)
                    .and_then(|condition| self.coerce_exact(condition, &TypeName::bool()));

                let body = self.check(body);

                Some(Typed::new(
                    span,
                    TypeName::void(),
                    TypedKind::While {
                        condition: Box::new(condition?),
                        body: Box::new(body?.discard_value()),
                    },
                ))
            }
        }
    }

    /// Converts the node to the `target` type, or reports an issue with the
    /// `code`.
    pub(crate) fn coerce(
        &mut self,
        typed: Typed,
        target: &TypeName,
        code: IssueCode,
    ) -> Option<Typed> {
        match self.convert(typed, target) {
            Ok(typed) => Some(typed),

            Err(typed) => {
                self.issue(
                    code,
                    typed.span.clone(),
                    format!("Expected '{target}', found '{}'.", typed.ty),
                    Some(target.clone()),
                    Some(typed.ty),
                );

                None
            }
        }
    }

    /// Reports an issue if the node's values cannot be rendered to strings.
    pub(crate) fn require_display(&mut self, typed: &Typed) -> bool {
        if !typed.ty.is_void() && self.registry.implements_display(&typed.ty) {
            return true;
        }

        self.issue(
            IssueCode::TypeMismatch,
            typed.span.clone(),
            format!("Values of type '{}' cannot be rendered to string.", typed.ty),
            Some(TypeName::string()),
            Some(typed.ty.clone()),
        );

        false
    }

    #[inline(always)]
    pub(crate) fn issue(
        &mut self,
        code: IssueCode,
        span: SiteSpan,
        message: String,
        expected: Option<TypeName>,
        actual: Option<TypeName>,
    ) {
        self.issues.push(TypeIssue {
            diagnostic: Diagnostic::new(code, span, message),
            expected,
            actual,
        });
    }

    #[inline(always)]
    fn conversion(&self, from: &TypeName, to: &TypeName) -> Option<Conversion> {
        conversion(self.registry, from, to)
    }

    fn convert(&self, typed: Typed, target: &TypeName) -> Result<Typed, Typed> {
        match self.conversion(&typed.ty, target) {
            Some(Conversion::Exact) => Ok(typed),

            Some(Conversion::Upcast) => Ok(Typed {
                ty: target.clone(),
                ..typed
            }),

            Some(Conversion::Widen) => Ok(typed.widen()),

            Some(Conversion::Discard) => Ok(typed.discard()),

            None => Err(typed),
        }
    }

    // Conditions and logical operands must be exactly `bool`.
    fn coerce_exact(&mut self, typed: Typed, target: &TypeName) -> Option<Typed> {
        if &typed.ty == target {
            return Some(typed);
        }

        self.issue(
            IssueCode::TypeMismatch,
            typed.span.clone(),
            format!("Expected '{target}', found '{}'.", typed.ty),
            Some(target.clone()),
            Some(typed.ty),
        );

        None
    }

    fn lookup(&self, name: &str) -> Option<&Local> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|local| local.name == name)
    }

    fn ident(&mut self, span: SiteSpan, name: &Name) -> Option<Typed> {
        if let Some(local) = self.lookup(&name.string) {
            return Some(Typed::new(span, local.ty.clone(), TypedKind::Local(local.slot)));
        }

        if let Some(global) = self.registry.global(&name.string) {
            return Some(Typed::new(
                span,
                global.ty(),
                TypedKind::Global(name.string.clone()),
            ));
        }

        let receiver = Typed::new(name.span.clone(), self.context.clone(), TypedKind::Context);

        self.select(span, receiver, name, true)
    }

    fn select(
        &mut self,
        span: SiteSpan,
        receiver: Typed,
        name: &Name,
        implicit: bool,
    ) -> Option<Typed> {
        let members = self.registry.members_of(&receiver.ty);
        let name_str = name.string.as_str();

        let is_parameterless = |symbol: &&Symbol, kind: MemberKind, name: &str| {
            let member = symbol.member();

            member.kind() == kind && member.name() == name && member.params().is_empty()
        };

        let capitalized = capitalize(name_str);
        let getter = format_compact!("get{capitalized}");
        let predicate = format_compact!("is{capitalized}");

        let found = members
            .iter()
            .find(|symbol| is_parameterless(symbol, MemberKind::Field, name_str))
            .or_else(|| {
                members
                    .iter()
                    .find(|symbol| is_parameterless(symbol, MemberKind::Method, name_str))
            })
            .or_else(|| {
                members
                    .iter()
                    .find(|symbol| is_parameterless(symbol, MemberKind::Method, getter.as_str()))
            })
            .or_else(|| {
                members.iter().find(|symbol| {
                    is_parameterless(symbol, MemberKind::Method, predicate.as_str())
                        && symbol.member().ret() == &TypeName::bool()
                })
            })
            .cloned();

        let Some(symbol) = found else {
            self.unknown_member(name, &receiver.ty, &members, implicit);
            return None;
        };

        Some(Typed::new(
            span,
            symbol.member().ret().clone(),
            TypedKind::Member {
                receiver: Box::new(receiver),
                symbol,
                args: Vec::new(),
            },
        ))
    }

    fn call(
        &mut self,
        span: SiteSpan,
        receiver: Typed,
        method: &Name,
        args: Vec<Typed>,
        implicit: bool,
    ) -> Option<Typed> {
        let members = self.registry.members_of(&receiver.ty);

        let candidates = members
            .iter()
            .filter(|symbol| {
                let member = symbol.member();

                member.kind() == MemberKind::Method && member.name() == method.string.as_str()
            })
            .collect::<Vec<_>>();

        if candidates.is_empty() {
            self.unknown_member(method, &receiver.ty, &members, implicit);
            return None;
        }

        let mut best: Option<(usize, &Symbol)> = None;

        'candidates: for candidate in candidates.iter().copied() {
            let params = candidate.member().params();

            if params.len() != args.len() {
                continue;
            }

            let mut cost = 0;

            for (arg, param) in args.iter().zip(params) {
                match self.conversion(&arg.ty, param) {
                    Some(Conversion::Exact) => (),
                    Some(Conversion::Widen) | Some(Conversion::Upcast) => cost += 1,
                    _ => continue 'candidates,
                }
            }

            match best {
                Some((best_cost, _)) if best_cost <= cost => (),
                _ => best = Some((cost, candidate)),
            }
        }

        let Some((_, symbol)) = best else {
            let provided = args
                .iter()
                .map(|arg| arg.ty.as_str())
                .collect::<Vec<_>>()
                .join(", ");

            let signatures = candidates
                .iter()
                .map(|candidate| candidate.member().signature())
                .collect::<Vec<_>>()
                .join(", ");

            self.issue(
                IssueCode::NoMatchingOverload,
                span,
                format!(
                    "No overload of '{}' accepts ({provided}). Candidates: {signatures}.",
                    method.string,
                ),
                None,
                None,
            );

            return None;
        };

        let symbol = symbol.clone();

        let args = args
            .into_iter()
            .zip(symbol.member().params())
            .map(|(arg, param)| match self.convert(arg, param) {
                Ok(arg) => arg,
                Err(arg) => arg,
            })
            .collect();

        Some(Typed::new(
            span,
            symbol.member().ret().clone(),
            TypedKind::Member {
                receiver: Box::new(receiver),
                symbol,
                args,
            },
        ))
    }

    fn unknown_member(
        &mut self,
        name: &Name,
        receiver: &TypeName,
        members: &[Symbol],
        implicit: bool,
    ) {
        let mut candidates = members
            .iter()
            .map(|symbol| symbol.member().name())
            .collect::<Vec<_>>();

        if implicit {
            candidates.extend(
                self.scopes
                    .iter()
                    .flat_map(|scope| scope.iter())
                    .map(|local| local.name.as_str()),
            );
        }

        let hint = match suggest(&name.string, candidates) {
            Some(candidate) => format!(" Did you mean '{candidate}'?"),
            None => String::new(),
        };

        let (code, message) = match implicit {
            true => (
                IssueCode::UnresolvedIdent,
                format!("Unresolved reference '{}'.{hint}", name.string),
            ),

            false => (
                IssueCode::UnknownMember,
                format!("Type '{receiver}' has no member '{}'.{hint}", name.string),
            ),
        };

        self.issue(code, name.span.clone(), message, None, Some(receiver.clone()));
    }

    fn unary(&mut self, span: SiteSpan, op: UnaryOp, operand: Typed) -> Option<Typed> {
        let ty = match (op, operand.ty.as_str()) {
            (UnaryOp::Neg, "int") => TypeName::int(),
            (UnaryOp::Neg, "double") => TypeName::double(),
            (UnaryOp::Not, "bool") => TypeName::bool(),

            _ => {
                self.issue(
                    IssueCode::UndefinedOperator,
                    span,
                    format!(
                        "Operator '{}' is not defined for '{}'.",
                        op.as_str(),
                        operand.ty,
                    ),
                    None,
                    Some(operand.ty),
                );

                return None;
            }
        };

        Some(Typed::new(
            span,
            ty,
            TypedKind::Unary {
                op,
                operand: Box::new(operand),
            },
        ))
    }

    fn binary(&mut self, span: SiteSpan, op: BinaryOp, left: Typed, right: Typed) -> Option<Typed> {
        let string = TypeName::string();

        if op == BinaryOp::Add && (left.ty == string || right.ty == string) {
            let left_ok = self.require_display(&left);
            let right_ok = self.require_display(&right);

            if !left_ok || !right_ok {
                return None;
            }

            let parts = match left.kind {
                TypedKind::Concat(mut parts) => {
                    parts.push(right);
                    parts
                }

                kind => vec![
                    Typed {
                        span: left.span,
                        ty: left.ty,
                        kind,
                    },
                    right,
                ],
            };

            return Some(Typed::new(span, string, TypedKind::Concat(parts)));
        }

        let left_ty = left.ty.clone();
        let right_ty = right.ty.clone();

        let operands = match op {
            BinaryOp::Or | BinaryOp::And => {
                let bool = TypeName::bool();

                match left.ty == bool && right.ty == bool {
                    true => Some((left, right, bool)),
                    false => None,
                }
            }

            _ if op.is_comparison() && left.ty == string && right.ty == string => {
                Some((left, right, TypeName::bool()))
            }

            _ if op.is_equality() => self.equality_operands(left, right),

            _ => self.numeric_operands(left, right),
        };

        let Some((left, right, operand_ty)) = operands else {
            self.issue(
                IssueCode::UndefinedOperator,
                span,
                format!(
                    "Operator '{}' is not defined for '{}' and '{}'.",
                    op.as_str(),
                    left_ty,
                    right_ty,
                ),
                None,
                None,
            );

            return None;
        };

        let ty = match op.is_comparison() || op.is_equality() || op.is_logical() {
            true => TypeName::bool(),
            false => operand_ty,
        };

        Some(Typed::new(
            span,
            ty,
            TypedKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        ))
    }

    fn numeric_operands(&mut self, left: Typed, right: Typed) -> Option<(Typed, Typed, TypeName)> {
        match (left.ty.as_str(), right.ty.as_str()) {
            ("int", "int") => Some((left, right, TypeName::int())),
            ("int", "double") => Some((left.widen(), right, TypeName::double())),
            ("double", "int") => Some((left, right.widen(), TypeName::double())),
            ("double", "double") => Some((left, right, TypeName::double())),
            _ => None,
        }
    }

    fn equality_operands(&mut self, left: Typed, right: Typed) -> Option<(Typed, Typed, TypeName)> {
        if left.ty.is_numeric() && right.ty.is_numeric() {
            return self.numeric_operands(left, right);
        }

        if left.ty.is_void() || right.ty.is_void() {
            return None;
        }

        if left.ty == right.ty
            || self.registry.is_subtype(&left.ty, &right.ty)
            || self.registry.is_subtype(&right.ty, &left.ty)
        {
            let ty = left.ty.clone();

            return Some((left, right, ty));
        }

        None
    }

    // Brings both branches of a conditional expression to a common type, or
    // discards their values if there is none.
    fn unify(&mut self, then: Typed, otherwise: Typed) -> (Typed, Typed, TypeName) {
        if then.ty == otherwise.ty {
            let ty = then.ty.clone();
            return (then, otherwise, ty);
        }

        if then.ty.is_numeric() && otherwise.ty.is_numeric() {
            return (then.to_double(), otherwise.to_double(), TypeName::double());
        }

        if self.registry.is_subtype(&then.ty, &otherwise.ty) {
            let ty = otherwise.ty.clone();
            return (then, otherwise, ty);
        }

        if self.registry.is_subtype(&otherwise.ty, &then.ty) {
            let ty = then.ty.clone();
            return (then, otherwise, ty);
        }

        (then.discard_value(), otherwise.discard_value(), TypeName::void())
    }

    fn define(
        &mut self,
        span: SiteSpan,
        mutable: bool,
        name: &Name,
        value: Typed,
    ) -> Option<Typed> {
        if value.ty.is_void() {
            self.issue(
                IssueCode::TypeMismatch,
                value.span.clone(),
                format!("Variable '{}' cannot be initialized with 'void'.", name.string),
                None,
                Some(value.ty),
            );

            return None;
        }

        let slot = self.slots;

        self.slots += 1;

        if let Some(scope) = self.scopes.last_mut() {
            scope.push(Local {
                name: name.string.clone(),
                slot,
                ty: value.ty.clone(),
                mutable,
            });
        }

        Some(Typed::new(
            span,
            TypeName::void(),
            TypedKind::Define {
                slot,
                value: Box::new(value),
            },
        ))
    }

    fn assign(&mut self, span: SiteSpan, target: &Name, value: Typed) -> Option<Typed> {
        let Some(local) = self.lookup(&target.string) else {
            self.issue(
                IssueCode::UnresolvedIdent,
                target.span.clone(),
                format!("Unresolved local variable '{}'.", target.string),
                None,
                None,
            );

            return None;
        };

        let slot = local.slot;
        let ty = local.ty.clone();

        if !local.mutable {
            self.issue(
                IssueCode::ImmutableAssignment,
                target.span.clone(),
                format!("Cannot assign to '{}' declared with 'val'.", target.string),
                None,
                None,
            );

            return None;
        }

        let value = self.coerce(value, &ty, IssueCode::TypeMismatch)?;

        Some(Typed::new(
            span,
            TypeName::void(),
            TypedKind::Assign {
                slot,
                value: Box::new(value),
            },
        ))
    }
}

impl Typed {
    #[inline(always)]
    fn discard_value(self) -> Self {
        match self.ty.is_void() {
            true => self,
            false => self.discard(),
        }
    }

    #[inline(always)]
    fn to_double(self) -> Self {
        match self.ty == TypeName::int() {
            true => self.widen(),
            false => self,
        }
    }
}

fn capitalize(name: &str) -> CompactString {
    let mut chars = name.chars();

    let mut result = CompactString::with_capacity(name.len());

    if let Some(first) = chars.next() {
        result.extend(first.to_uppercase());
    }

    result.push_str(chars.as_str());

    result
}
