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

use lady_deirdre::lexis::SiteSpan;

use crate::{
    interpret::assembly::{
        Assembly,
        Cmd,
        CmdIndex,
        ConcatCmd,
        IfFalseCmd,
        InvokeCmd,
        JumpCmd,
        LoadCmd,
        OpCmd,
        PopCmd,
        PushBoolCmd,
        PushConstantCmd,
        PushContextCmd,
        PushDoubleCmd,
        PushIntCmd,
        PushStringCmd,
        PushVoidCmd,
        StoreCmd,
        WidenCmd,
    },
    report::system_panic,
    runtime::TypeRegistry,
    semantics::{Analysis, Typed, TypedKind},
    syntax::BinaryOp,
};

impl Assembly {
    /// Generates the program of the analyzed expression.
    ///
    /// The program leaves exactly one value on the stack, the expression's
    /// result.
    pub(crate) fn compile(registry: &TypeRegistry, analysis: &Analysis) -> Self {
        let mut compiler = Compiler {
            registry,
            assembly: Self {
                frame: analysis.frame,
                ..Self::default()
            },
        };

        for definition in &analysis.header {
            compiler.compile_node(definition);
            compiler.push(definition.span.clone(), Cmd::Pop(PopCmd));
        }

        compiler.assembly.header_end = compiler.assembly.commands.len();

        compiler.compile_node(&analysis.body);

        compiler.assembly
    }
}

struct Compiler<'a> {
    registry: &'a TypeRegistry,
    assembly: Assembly,
}

impl<'a> Compiler<'a> {
    fn compile_node(&mut self, node: &Typed) {
        let span = node.span.clone();

        match &node.kind {
            TypedKind::Void => self.push(span, Cmd::PushVoid(PushVoidCmd)),

            TypedKind::Bool(value) => self.push(span, Cmd::PushBool(PushBoolCmd { value: *value })),

            TypedKind::Int(value) => self.push(span, Cmd::PushInt(PushIntCmd { value: *value })),

            TypedKind::Double(value) => {
                self.push(span, Cmd::PushDouble(PushDoubleCmd { value: *value }))
            }

            TypedKind::String(value) => {
                let string_index = match self
                    .assembly
                    .strings
                    .iter()
                    .position(|string| string == value)
                {
                    Some(index) => index,

                    None => {
                        self.assembly.strings.push(value.clone());
                        self.assembly.strings.len() - 1
                    }
                };

                self.push(span, Cmd::PushString(PushStringCmd { string_index }))
            }

            TypedKind::Context => self.push(span, Cmd::PushContext(PushContextCmd)),

            TypedKind::Global(name) => {
                let Some(global) = self.registry.global(name) else {
                    system_panic!("Unresolved global '{name}'.");
                };

                self.assembly.constants.push(global.value().clone());

                let constant_index = self.assembly.constants.len() - 1;

                self.push(span, Cmd::PushConstant(PushConstantCmd { constant_index }))
            }

            TypedKind::Local(slot) => self.push(span, Cmd::Load(LoadCmd { slot: *slot })),

            TypedKind::Member {
                receiver,
                symbol,
                args,
            } => {
                self.compile_node(receiver);

                for arg in args {
                    self.compile_node(arg);
                }

                self.assembly.symbols.push(symbol.clone());

                let symbol_index = self.assembly.symbols.len() - 1;

                self.push(
                    span,
                    Cmd::Invoke(InvokeCmd {
                        symbol_index,
                        arity: args.len(),
                    }),
                )
            }

            TypedKind::Widen(operand) => {
                self.compile_node(operand);
                self.push(span, Cmd::Widen(WidenCmd));
            }

            TypedKind::Discard(operand) => {
                self.compile_node(operand);
                self.push(span.clone(), Cmd::Pop(PopCmd));
                self.push(span, Cmd::PushVoid(PushVoidCmd));
            }

            TypedKind::Unary { op, operand } => {
                self.compile_node(operand);
                self.push(span, Cmd::Op(OpCmd::from(*op)));
            }

            TypedKind::Binary { op, left, right } => match OpCmd::from_binary(*op) {
                Some(op) => {
                    self.compile_node(left);
                    self.compile_node(right);
                    self.push(span, Cmd::Op(op));
                }

                // Short-circuit evaluation:
                //
                //     a && b  =>  a; if-false L1; b; jump L2; L1: push false; L2:
                //     a || b  =>  a; if-false L1; push true; jump L2; L1: b; L2:
                None => {
                    let is_and = *op == BinaryOp::And;

                    self.compile_node(left);

                    let if_false = self.push_placeholder(span.clone());

                    match is_and {
                        true => self.compile_node(right),
                        false => {
                            self.push(span.clone(), Cmd::PushBool(PushBoolCmd { value: true }))
                        }
                    }

                    let jump = self.push_placeholder(span.clone());

                    self.patch_if_false(if_false);

                    match is_and {
                        true => self.push(span, Cmd::PushBool(PushBoolCmd { value: false })),
                        false => self.compile_node(right),
                    }

                    self.patch_jump(jump);
                }
            },

            TypedKind::Concat(parts) => {
                for part in parts {
                    self.compile_node(part);
                }

                self.push(span, Cmd::Concat(ConcatCmd { items: parts.len() }));
            }

            TypedKind::If {
                condition,
                then,
                otherwise,
            } => {
                self.compile_node(condition);

                let if_false = self.push_placeholder(span.clone());

                self.compile_node(then);

                let jump = self.push_placeholder(span.clone());

                self.patch_if_false(if_false);

                match otherwise {
                    Some(otherwise) => self.compile_node(otherwise),
                    None => self.push(span, Cmd::PushVoid(PushVoidCmd)),
                }

                self.patch_jump(jump);
            }

            TypedKind::Block(statements) => {
                let Some((last, init)) = statements.split_last() else {
                    self.push(span, Cmd::PushVoid(PushVoidCmd));
                    return;
                };

                for statement in init {
                    self.compile_node(statement);
                    self.push(statement.span.clone(), Cmd::Pop(PopCmd));
                }

                self.compile_node(last);
            }

            TypedKind::Define { slot, value } | TypedKind::Assign { slot, value } => {
                self.compile_node(value);
                self.push(span.clone(), Cmd::Store(StoreCmd { slot: *slot }));
                self.push(span, Cmd::PushVoid(PushVoidCmd));
            }

            TypedKind::While { condition, body } => {
                let start = self.assembly.commands.len();

                self.compile_node(condition);

                let if_false = self.push_placeholder(span.clone());

                self.compile_node(body);
                self.push(span.clone(), Cmd::Pop(PopCmd));
                self.push(span.clone(), Cmd::Jump(JumpCmd { command: start }));

                self.patch_if_false(if_false);

                self.push(span, Cmd::PushVoid(PushVoidCmd));
            }
        }
    }

    #[inline(always)]
    fn push(&mut self, span: SiteSpan, cmd: Cmd) {
        self.assembly.commands.push(cmd);
        self.assembly.spans.push(span);
    }

    #[inline(always)]
    fn push_placeholder(&mut self, span: SiteSpan) -> CmdIndex {
        let index = self.assembly.commands.len();

        self.push(span, Cmd::Jump(JumpCmd { command: index }));

        index
    }

    #[inline(always)]
    fn patch_if_false(&mut self, index: CmdIndex) {
        let otherwise = self.assembly.commands.len();

        let Some(cmd) = self.assembly.commands.get_mut(index) else {
            system_panic!("Missing placeholder command.");
        };

        *cmd = Cmd::IfFalse(IfFalseCmd { otherwise });
    }

    #[inline(always)]
    fn patch_jump(&mut self, index: CmdIndex) {
        let command = self.assembly.commands.len();

        let Some(cmd) = self.assembly.commands.get_mut(index) else {
            system_panic!("Missing placeholder command.");
        };

        *cmd = Cmd::Jump(JumpCmd { command });
    }
}
