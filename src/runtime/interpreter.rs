use crate::language::ast::*;
use crate::runtime::{
    console::Console,
    constructor::Constructor,
    environment::Environment,
    error::{RuntimeError, RuntimeResult},
    record::Record,
    value::{Callable, Function, Value},
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

const MAX_CALL_DEPTH: usize = 64;
const MAX_EVAL_DEPTH: usize = 256;

pub struct Interpreter {
    env: Rc<RefCell<Environment>>,
    console: Console,
}

enum Flow {
    Next,
    Return(Value),
}

impl Interpreter {
    pub fn new(console: Console) -> Self {
        let interpreter = Self {
            env: Rc::new(RefCell::new(Environment::new())),
            console,
        };
        interpreter.install_globals();
        interpreter
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.env.borrow().get(name)
    }

    pub fn run(&mut self, program: &Program) -> RuntimeResult<()> {
        for statement in &program.statements {
            if let Flow::Return(_) = self.execute(statement, None)? {
                return Err(RuntimeError::Unsupported {
                    message: "`return` outside of a function body".into(),
                });
            }
        }
        Ok(())
    }

    fn install_globals(&self) {
        let console = Record::new();
        let sink = self.console.clone();
        console.set(
            "log",
            Function::native(Some("log"), move |_, args| {
                let line = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                sink.log(line);
                Ok(Value::Undefined)
            }),
        );

        let object = Record::new();
        object.set(
            "create",
            Function::native(Some("create"), |_, args| match args.first() {
                Some(Value::Record(delegate)) => Ok(Value::Record(Record::with_delegate(delegate))),
                Some(Value::Null) => Ok(Value::Record(Record::new())),
                other => Err(RuntimeError::TypeMismatch {
                    message: format!(
                        "Object.create expects a record or null, found {}",
                        other.map_or("undefined", Value::type_name)
                    ),
                }),
            }),
        );

        let mut env = self.env.borrow_mut();
        env.declare("console", Value::Record(console));
        env.declare("Object", Value::Record(object));
    }

    fn execute(&self, statement: &Statement, this: Option<&Record>) -> RuntimeResult<Flow> {
        match statement {
            Statement::Constructor(def) => {
                let name = def.name.clone().unwrap_or_default();
                let initializer = self.function_value(def);
                let constructor =
                    Constructor::with_initializer(&name, def.params.iter().cloned(), initializer);
                debug!(constructor = %name, params = def.params.len(), "declared constructor");
                self.env
                    .borrow_mut()
                    .declare(&name, Value::Constructor(Rc::new(constructor)));
            }
            Statement::Let { name, value, .. } => {
                let value = self.eval(value, this)?;
                trace!(name = %name, "let binding");
                self.env.borrow_mut().declare(name, value);
            }
            Statement::Assign { target, value, .. } => {
                let value = self.eval(value, this)?;
                match target {
                    AssignTarget::Variable(name) => self.env.borrow_mut().assign(name, value)?,
                    AssignTarget::Property { object, key } => {
                        let target = self.eval(object, this)?;
                        self.write_property(&target, key, value)?;
                    }
                }
            }
            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr, this)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
            Statement::Expr(expr) => {
                self.eval(expr, this)?;
            }
        }
        Ok(Flow::Next)
    }

    fn eval(&self, expr: &Expr, this: Option<&Record>) -> RuntimeResult<Value> {
        self.env.borrow_mut().enter_expression(MAX_EVAL_DEPTH)?;
        let result = self.eval_kind(expr, this);
        self.env.borrow_mut().leave_expression();
        result
    }

    fn eval_kind(&self, expr: &Expr, this: Option<&Record>) -> RuntimeResult<Value> {
        match &expr.kind {
            ExprKind::Number(value) => Ok(Value::Number(*value)),
            ExprKind::String(value) => Ok(Value::String(value.clone())),
            ExprKind::Bool(value) => Ok(Value::Bool(*value)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::This => this
                .cloned()
                .map(Value::Record)
                .ok_or_else(|| RuntimeError::Unsupported {
                    message: "`this` is only available inside a function body".into(),
                }),
            ExprKind::Identifier(name) => {
                self.env
                    .borrow()
                    .get(name)
                    .ok_or_else(|| RuntimeError::UnknownSymbol { name: name.clone() })
            }
            ExprKind::Member { object, property } => {
                let target = self.eval(object, this)?;
                read_property(&target, property)
            }
            ExprKind::Call { callee, args } => {
                let ExprKind::Member { object, property } = &callee.kind else {
                    return Err(RuntimeError::Unsupported {
                        message: format!(
                            "`{}` is called without a receiver; call functions as methods, e.g. `record.method()`",
                            callee.as_source()
                        ),
                    });
                };
                let receiver = self.eval(object, this)?;
                let args = self.eval_args(args, this)?;
                match receiver {
                    Value::Record(record) => record.invoke(property, &args),
                    other => Err(RuntimeError::TypeMismatch {
                        message: format!("Cannot call `{property}` on {}", other.type_name()),
                    }),
                }
            }
            ExprKind::New { constructor, args } => {
                let Value::Constructor(ctor) = self.eval(constructor, this)? else {
                    return Err(RuntimeError::TypeMismatch {
                        message: format!("`{}` is not a constructor", constructor.as_source()),
                    });
                };
                let args = self.eval_args(args, this)?;
                ctor.construct(&args).map(Value::Record)
            }
            ExprKind::Function(def) => Ok(Value::Function(self.function_value(def))),
            ExprKind::Add(operands) => {
                let mut operands = operands.iter();
                let mut sum = match operands.next() {
                    Some(first) => self.eval(first, this)?,
                    None => Value::Undefined,
                };
                for operand in operands {
                    let right = self.eval(operand, this)?;
                    sum = add(sum, right)?;
                }
                Ok(sum)
            }
        }
    }

    fn eval_args(&self, args: &[Expr], this: Option<&Record>) -> RuntimeResult<Vec<Value>> {
        args.iter().map(|arg| self.eval(arg, this)).collect()
    }

    fn write_property(&self, target: &Value, key: &str, value: Value) -> RuntimeResult<()> {
        match target {
            Value::Record(record) => {
                record.set(key, value);
                Ok(())
            }
            Value::Constructor(ctor) => Err(RuntimeError::Unsupported {
                message: format!(
                    "properties of constructor `{}` are fixed; assign to `{}.prototype.{key}` instead",
                    ctor.name(),
                    ctor.name()
                ),
            }),
            other => Err(RuntimeError::TypeMismatch {
                message: format!("Cannot set property `{key}` on {}", other.type_name()),
            }),
        }
    }

    fn function_value(&self, def: &Rc<FunctionDef>) -> Function {
        let body = ScriptFunction {
            def: Rc::clone(def),
            env: Rc::downgrade(&self.env),
            console: self.console.clone(),
        };
        Function::new(def.name.clone(), Rc::new(body))
    }

    fn execute_body(&self, body: &[Statement], this: &Record) -> RuntimeResult<Value> {
        for statement in body {
            if let Flow::Return(value) = self.execute(statement, Some(this))? {
                return Ok(value);
            }
        }
        Ok(Value::Undefined)
    }
}

fn read_property(target: &Value, key: &str) -> RuntimeResult<Value> {
    match target {
        Value::Record(record) => Ok(record.resolve(key).unwrap_or(Value::Undefined)),
        Value::Constructor(ctor) => Ok(match key {
            "prototype" => Value::Record(ctor.prototype().clone()),
            "name" => Value::String(ctor.name().to_string()),
            _ => Value::Undefined,
        }),
        Value::Null | Value::Undefined => Err(RuntimeError::TypeMismatch {
            message: format!("Cannot read property `{key}` of {target}"),
        }),
        _ => Ok(Value::Undefined),
    }
}

fn add(left: Value, right: Value) -> RuntimeResult<Value> {
    match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::String(_), _) | (_, Value::String(_)) => Ok(Value::String(format!("{left}{right}"))),
        _ => Err(RuntimeError::TypeMismatch {
            message: format!("Cannot add {} and {}", left.type_name(), right.type_name()),
        }),
    }
}

/// A function written in a walk script. It holds the environment weakly so
/// functions stored in globals do not keep the environment alive.
struct ScriptFunction {
    def: Rc<FunctionDef>,
    env: Weak<RefCell<Environment>>,
    console: Console,
}

impl Callable for ScriptFunction {
    fn call(&self, this: &Record, args: &[Value]) -> RuntimeResult<Value> {
        let env = self.env.upgrade().ok_or_else(|| RuntimeError::Unsupported {
            message: "function outlived the script that defined it".into(),
        })?;
        if env.borrow().depth() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::Unsupported {
                message: format!("call depth exceeded {MAX_CALL_DEPTH} nested calls"),
            });
        }

        let bindings: HashMap<String, Value> = self
            .def
            .params
            .iter()
            .enumerate()
            .map(|(idx, param)| {
                let arg = args.get(idx).cloned().unwrap_or(Value::Undefined);
                (param.clone(), arg)
            })
            .collect();
        let interpreter = Interpreter {
            env,
            console: self.console.clone(),
        };
        interpreter.env.borrow_mut().push_frame(bindings);
        let result = interpreter.execute_body(&self.def.body, this);
        interpreter.env.borrow_mut().pop_frame();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::parse_source;

    fn run(source: &str) -> Result<Vec<String>, RuntimeError> {
        let program = parse_source(source).expect("parse");
        let mut interpreter = Interpreter::new(Console::capture());
        interpreter.run(&program)?;
        Ok(interpreter.console().lines())
    }

    const PERSON: &str = "
        function Person(name, age) {
            this.name = name;
            this.age = age;
        }
        Person.prototype.movement_means = null;
        Person.prototype.movement = function() {
            return 'Moves by ' + this.movement_means;
        };
    ";

    #[test]
    fn inherited_method_uses_receiver_fields() {
        let source = format!(
            "{PERSON}
            let yoshi = new Person('Yoshi', 23);
            console.log(yoshi.movement());
            yoshi.movement_means = 'making giant steps';
            console.log(yoshi.movement());
            let baby = Object.create(yoshi);
            baby.age = 1;
            console.log(baby.age, yoshi.age);
            console.log(baby.movement());
            baby.movement_means = 'making tiny steps';
            console.log(baby.movement());
            console.log(yoshi.movement());"
        );
        assert_eq!(
            run(&source).expect("run"),
            vec![
                "Moves by null",
                "Moves by making giant steps",
                "1 23",
                "Moves by making giant steps",
                "Moves by making tiny steps",
                "Moves by making giant steps",
            ]
        );
    }

    #[test]
    fn missing_properties_read_as_undefined() {
        let source = format!("{PERSON} let p = new Person('Ninja', 23); console.log(p.nationality);");
        assert_eq!(run(&source).expect("run"), vec!["undefined"]);
    }

    #[test]
    fn constructor_exposes_prototype_and_name() {
        let source = format!(
            "{PERSON} console.log(Person.name, Person); console.log(Person.prototype);"
        );
        assert_eq!(
            run(&source).expect("run"),
            vec![
                "Person [Function: Person]",
                "{ movement_means: null, movement: [Function (anonymous)] }",
            ]
        );
    }

    #[test]
    fn this_outside_function_is_rejected() {
        let err = run("this.name = 'x';").unwrap_err();
        assert!(matches!(err, RuntimeError::Unsupported { .. }));
    }

    #[test]
    fn new_requires_a_constructor() {
        let err = run("let x = 1; let y = new x();").unwrap_err();
        assert!(
            matches!(&err, RuntimeError::TypeMismatch { message } if message == "`x` is not a constructor")
        );
    }

    #[test]
    fn constructor_arity_is_checked() {
        let source = format!("{PERSON} let p = new Person('Yoshi');");
        assert!(matches!(
            run(&source).unwrap_err(),
            RuntimeError::ArityMismatch {
                expected: 2,
                received: 1,
                ..
            }
        ));
    }

    #[test]
    fn top_level_return_is_rejected() {
        assert!(matches!(
            run("return 1;").unwrap_err(),
            RuntimeError::Unsupported { .. }
        ));
    }

    #[test]
    fn bare_calls_are_rejected() {
        let err = run("let f = function() { return 1; }; f();").unwrap_err();
        assert!(matches!(&err, RuntimeError::Unsupported { message } if message.starts_with("`f` is called")));
    }

    #[test]
    fn callee_frames_do_not_see_caller_locals() {
        let source = "
            function Box(v) { this.v = v; }
            Box.prototype.peek = function() { return secret; };
            Box.prototype.outer = function() { let secret = 1; return this.peek(); };
            let b = new Box(1);
            b.outer();
        ";
        assert!(matches!(
            run(source).unwrap_err(),
            RuntimeError::UnknownSymbol { name } if name == "secret"
        ));
    }

    #[test]
    fn runaway_recursion_is_bounded() {
        let source = "
            function Box(v) { this.v = v; }
            Box.prototype.spin = function() { return this.spin(); };
            let b = new Box(1);
            b.spin();
        ";
        assert!(matches!(
            run(source).unwrap_err(),
            RuntimeError::Unsupported { message } if message.starts_with("call depth exceeded")
        ));
    }

    #[test]
    fn object_create_accepts_records_and_null() {
        let source = "
            let base = Object.create(null);
            base.greeting = 'hi';
            let derived = Object.create(base);
            console.log(derived.greeting, derived, base);
        ";
        assert_eq!(
            run(source).expect("run"),
            vec!["hi Object <[Object: null prototype]> {} [Object: null prototype] { greeting: 'hi' }"]
        );
        assert!(matches!(
            run("Object.create(5);").unwrap_err(),
            RuntimeError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn addition_rules() {
        assert_eq!(
            run("console.log(1 + 2, 'a' + 1, 'n: ' + null, 2 + 'b' + undefined);").expect("run"),
            vec!["3 a1 n: null 2bundefined"]
        );
        assert!(matches!(
            run("console.log(null + 1);").unwrap_err(),
            RuntimeError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn calling_a_data_property_fails() {
        let source = format!("{PERSON} let p = new Person('Yoshi', 23); p.name();");
        assert!(matches!(
            run(&source).unwrap_err(),
            RuntimeError::NotCallable { .. }
        ));
    }

    #[test]
    fn variables_can_be_reassigned() {
        assert_eq!(
            run("let a = 'one'; a = 'two'; console.log(a);").expect("run"),
            vec!["two"]
        );
        assert!(matches!(
            run("ghost = 1;").unwrap_err(),
            RuntimeError::UnknownSymbol { .. }
        ));
    }

    #[test]
    fn long_sums_evaluate_without_recursing() {
        let terms = vec!["1"; 200_000].join(" + ");
        let lines = run(&format!("console.log({terms});")).expect("run");
        assert_eq!(lines, vec!["200000"]);

        let lines = run("console.log(1 + 2 + 'x' + (1 + 2), 'x' + (1 + 2) + 3);").expect("run");
        assert_eq!(lines, vec!["3x3 x33"]);
    }

    #[test]
    fn nested_evaluation_across_calls_is_bounded() {
        let nested = format!("{}this.dive(){}", "1 + (".repeat(100), ")".repeat(100));
        let source = format!(
            "function Diver() {{}}
            Diver.prototype.dive = function() {{ return {nested}; }};
            let diver = new Diver();
            diver.dive();"
        );
        assert!(matches!(
            run(&source).unwrap_err(),
            RuntimeError::Unsupported { message } if message.starts_with("expression nesting exceeded")
        ));
    }
}
