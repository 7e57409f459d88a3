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

use std::cmp::Ordering;

use compact_str::CompactString;

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
        PushConstantCmd,
        PushStringCmd,
        StoreCmd,
    },
    report::system_panic,
    runtime::{InvokeResult, RuntimeCause, TypeRegistry, Value},
};

impl Assembly {
    /// Runs the program against the `context` value.
    ///
    /// On failure, returns the index of the failed command together with the
    /// failure cause.
    pub(crate) fn execute(
        &self,
        registry: &TypeRegistry,
        context: &Value,
    ) -> Result<Value, (CmdIndex, RuntimeCause)> {
        let mut engine = Engine {
            assembly: self,
            registry,
            stack: Vec::new(),
            locals: vec![Value::Void; self.frame],
            cmd_index: 0,
        };

        loop {
            let Some(cmd) = self.commands.get(engine.cmd_index) else {
                break;
            };

            let result = match cmd {
                Cmd::IfFalse(cmd) => engine.execute_if_false(cmd),
                Cmd::Jump(cmd) => engine.execute_jump(cmd),
                Cmd::Pop(..) => engine.execute_pop(),
                Cmd::PushVoid(..) => engine.execute_push(Value::Void),
                Cmd::PushBool(cmd) => engine.execute_push(Value::Bool(cmd.value)),
                Cmd::PushInt(cmd) => engine.execute_push(Value::Int(cmd.value)),
                Cmd::PushDouble(cmd) => engine.execute_push(Value::Double(cmd.value)),
                Cmd::PushString(cmd) => engine.execute_push_string(cmd),
                Cmd::PushConstant(cmd) => engine.execute_push_constant(cmd),
                Cmd::PushContext(..) => engine.execute_push(context.clone()),
                Cmd::Load(cmd) => engine.execute_load(cmd),
                Cmd::Store(cmd) => engine.execute_store(cmd),
                Cmd::Widen(..) => engine.execute_widen(),
                Cmd::Concat(cmd) => engine.execute_concat(cmd),
                Cmd::Invoke(cmd) => engine.execute_invoke(cmd),
                Cmd::Op(OpCmd::Neg) => engine.execute_op_neg(),
                Cmd::Op(OpCmd::Not) => engine.execute_op_not(),
                Cmd::Op(OpCmd::Equal) => engine.execute_op_equal(false),
                Cmd::Op(OpCmd::NotEqual) => engine.execute_op_equal(true),
                Cmd::Op(op @ OpCmd::Greater)
                | Cmd::Op(op @ OpCmd::GreaterOrEqual)
                | Cmd::Op(op @ OpCmd::Lesser)
                | Cmd::Op(op @ OpCmd::LesserOrEqual) => engine.execute_op_compare(*op),
                Cmd::Op(op) => engine.execute_op_arithmetic(*op),
            };

            if let Err(cause) = result {
                return Err((engine.cmd_index, cause));
            }
        }

        let result = engine.pop();

        if !engine.stack.is_empty() {
            system_panic!("Unbalanced stack after evaluation.");
        }

        Ok(result)
    }
}

struct Engine<'a> {
    assembly: &'a Assembly,
    registry: &'a TypeRegistry,
    stack: Vec<Value>,
    locals: Vec<Value>,
    cmd_index: CmdIndex,
}

impl<'a> Engine<'a> {
    fn execute_if_false(&mut self, cmd: &IfFalseCmd) -> InvokeResult<()> {
        let IfFalseCmd { otherwise } = cmd;

        match self.pop().expect_bool(0)? {
            true => self.cmd_index += 1,
            false => self.cmd_index = *otherwise,
        }

        Ok(())
    }

    #[inline(always)]
    fn execute_jump(&mut self, cmd: &JumpCmd) -> InvokeResult<()> {
        let JumpCmd { command } = cmd;

        self.cmd_index = *command;

        Ok(())
    }

    #[inline(always)]
    fn execute_pop(&mut self) -> InvokeResult<()> {
        let _ = self.pop();

        self.cmd_index += 1;

        Ok(())
    }

    #[inline(always)]
    fn execute_push(&mut self, value: Value) -> InvokeResult<()> {
        self.stack.push(value);

        self.cmd_index += 1;

        Ok(())
    }

    fn execute_push_string(&mut self, cmd: &PushStringCmd) -> InvokeResult<()> {
        let PushStringCmd { string_index } = cmd;

        let Some(string) = self.assembly.strings.get(*string_index) else {
            system_panic!("Missing string {string_index}.");
        };

        self.execute_push(Value::String(string.clone()))
    }

    fn execute_push_constant(&mut self, cmd: &PushConstantCmd) -> InvokeResult<()> {
        let PushConstantCmd { constant_index } = cmd;

        let Some(constant) = self.assembly.constants.get(*constant_index) else {
            system_panic!("Missing constant {constant_index}.");
        };

        self.execute_push(constant.clone())
    }

    fn execute_load(&mut self, cmd: &LoadCmd) -> InvokeResult<()> {
        let LoadCmd { slot } = cmd;

        let Some(value) = self.locals.get(*slot) else {
            system_panic!("Missing local slot {slot}.");
        };

        self.execute_push(value.clone())
    }

    fn execute_store(&mut self, cmd: &StoreCmd) -> InvokeResult<()> {
        let StoreCmd { slot } = cmd;

        let value = self.pop();

        let Some(local) = self.locals.get_mut(*slot) else {
            system_panic!("Missing local slot {slot}.");
        };

        *local = value;

        self.cmd_index += 1;

        Ok(())
    }

    fn execute_widen(&mut self) -> InvokeResult<()> {
        let value = self.pop().expect_double(0)?;

        self.execute_push(Value::Double(value))
    }

    fn execute_concat(&mut self, cmd: &ConcatCmd) -> InvokeResult<()> {
        let ConcatCmd { items } = cmd;

        let items = self.pop_many(*items);

        let mut result = CompactString::default();

        for item in &items {
            result.push_str(&self.registry.stringify(item)?);
        }

        self.execute_push(Value::String(result))
    }

    fn execute_invoke(&mut self, cmd: &InvokeCmd) -> InvokeResult<()> {
        let InvokeCmd {
            symbol_index,
            arity,
        } = cmd;

        let Some(symbol) = self.assembly.symbols.get(*symbol_index) else {
            system_panic!("Missing symbol {symbol_index}.");
        };

        let args = self.pop_many(*arity);
        let receiver = self.pop();

        let result = symbol.invoke(self.registry, &receiver, &args)?;

        let member = symbol.member();
        let expected = member.ret();

        if expected.is_void() {
            return self.execute_push(Value::Void);
        }

        let actual = result.type_name();

        if &actual != expected && !self.registry.is_subtype(&actual, expected) {
            return Err(RuntimeCause::ReturnType {
                member: member.signature(),
                expected: expected.clone(),
                actual,
            });
        }

        self.execute_push(result)
    }

    fn execute_op_neg(&mut self) -> InvokeResult<()> {
        let result = match self.pop() {
            Value::Int(value) => Value::Int(value.checked_neg().ok_or(RuntimeCause::Overflow {
                operation: "negation",
            })?),

            Value::Double(value) => Value::Double(-value),

            value => system_panic!("Negation of '{}'.", value.type_name()),
        };

        self.execute_push(result)
    }

    fn execute_op_not(&mut self) -> InvokeResult<()> {
        let value = self.pop().expect_bool(0)?;

        self.execute_push(Value::Bool(!value))
    }

    fn execute_op_equal(&mut self, negate: bool) -> InvokeResult<()> {
        let rhs = self.pop();
        let lhs = self.pop();

        self.execute_push(Value::Bool((lhs == rhs) != negate))
    }

    fn execute_op_compare(&mut self, op: OpCmd) -> InvokeResult<()> {
        let rhs = self.pop();
        let lhs = self.pop();

        let ordering = match (&lhs, &rhs) {
            (Value::Int(lhs), Value::Int(rhs)) => Some(lhs.cmp(rhs)),
            (Value::Double(lhs), Value::Double(rhs)) => lhs.partial_cmp(rhs),
            (Value::String(lhs), Value::String(rhs)) => Some(lhs.cmp(rhs)),

            _ => system_panic!(
                "Comparison of '{}' and '{}'.",
                lhs.type_name(),
                rhs.type_name(),
            ),
        };

        let result = match (op, ordering) {
            (_, None) => false,
            (OpCmd::Greater, Some(ordering)) => ordering == Ordering::Greater,
            (OpCmd::GreaterOrEqual, Some(ordering)) => ordering != Ordering::Less,
            (OpCmd::Lesser, Some(ordering)) => ordering == Ordering::Less,
            (OpCmd::LesserOrEqual, Some(ordering)) => ordering != Ordering::Greater,
            _ => system_panic!("'{op}' is not a comparison."),
        };

        self.execute_push(Value::Bool(result))
    }

    fn execute_op_arithmetic(&mut self, op: OpCmd) -> InvokeResult<()> {
        let rhs = self.pop();
        let lhs = self.pop();

        let result = match (lhs, rhs) {
            (Value::Int(lhs), Value::Int(rhs)) => Value::Int(int_arithmetic(op, lhs, rhs)?),

            (Value::Double(lhs), Value::Double(rhs)) => Value::Double(match op {
                OpCmd::Add => lhs + rhs,
                OpCmd::Sub => lhs - rhs,
                OpCmd::Mul => lhs * rhs,
                OpCmd::Div => lhs / rhs,
                OpCmd::Rem => lhs % rhs,
                _ => system_panic!("'{op}' is not an arithmetic operator."),
            }),

            (lhs, rhs) => system_panic!(
                "Operator '{op}' applied to '{}' and '{}'.",
                lhs.type_name(),
                rhs.type_name(),
            ),
        };

        self.execute_push(result)
    }

    #[inline(always)]
    fn pop(&mut self) -> Value {
        match self.stack.pop() {
            Some(value) => value,
            None => system_panic!("Stack underflow."),
        }
    }

    #[inline(always)]
    fn pop_many(&mut self, count: usize) -> Vec<Value> {
        let Some(split) = self.stack.len().checked_sub(count) else {
            system_panic!("Stack underflow.");
        };

        self.stack.split_off(split)
    }
}

fn int_arithmetic(op: OpCmd, lhs: i64, rhs: i64) -> InvokeResult<i64> {
    let (result, operation) = match op {
        OpCmd::Add => (lhs.checked_add(rhs), "addition"),
        OpCmd::Sub => (lhs.checked_sub(rhs), "subtraction"),
        OpCmd::Mul => (lhs.checked_mul(rhs), "multiplication"),

        OpCmd::Div | OpCmd::Rem if rhs == 0 => return Err(RuntimeCause::DivisionByZero),

        OpCmd::Div => (lhs.checked_div(rhs), "division"),
        OpCmd::Rem => (lhs.checked_rem(rhs), "remainder"),

        _ => system_panic!("'{op}' is not an arithmetic operator."),
    };

    result.ok_or(RuntimeCause::Overflow { operation })
}
