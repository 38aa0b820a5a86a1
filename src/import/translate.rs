//! translate.rs
//! Two-pass translation of one low-level function stream into a [`Graph`].
//!
//! Pass 1 interns every floating-point constant operand, in first-occurrence
//! order, so constant nodes are numbered before any operator references
//! them. Pass 2 walks the instructions in program order, resolving operands
//! through identity-keyed maps and appending operator records; the running
//! result-node counter starts right after the constant range.
//!
//! Comparisons need care: the source stream has already lowered control flow
//! into a compare / combine / select shape, negating branch conditions on
//! the way. The combine-of-comparisons translation therefore uses an
//! order-swapping predicate mapping (not-equal becomes comp_eq over
//! swapped operands, and so on) that undoes the upstream negation. The
//! select translation maps predicates directly, with no swap. Both mappings
//! are exact contracts; do not "correct" them.

use super::stream::{FloatBinOp, FunctionStream, InstrKind, Operand, Predicate, ValueId};
use crate::graph::{Graph, OpCode};
use smallvec::SmallVec;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("cannot handle the instruction {0}")]
    UnsupportedInstruction(String),
    #[error("cannot call the function {0}")]
    UnknownCallee(String),
    #[error("function {name} called with {found} arguments, expected {expected}")]
    CalleeArity {
        name: String,
        found: usize,
        expected: usize,
    },
    #[error("operand of {0} used before definition")]
    UndefinedOperand(&'static str),
    #[error("load through a pointer that is not an input-vector element")]
    UnmappedLoadPointer,
    #[error("element offset from a base other than the input or output pointer")]
    UnsupportedOffsetBase,
    #[error("store through a pointer that is not an output-vector element")]
    UnmappedStorePointer,
    #[error("store to dependent slot {index}, but only {n_dependent} slots are declared")]
    StoreOutOfRange { index: usize, n_dependent: usize },
    #[error("dependent slot {0} written more than once")]
    DuplicateStore(usize),
    #[error("no store instruction for dependent variable index {0}")]
    MissingStore(usize),
    #[error("no comparison record for select condition")]
    MissingCompare,
    #[error("cannot map comparison predicate {predicate} in {context}")]
    UnmappedPredicate {
        predicate: &'static str,
        context: &'static str,
    },
}

#[derive(Clone)]
struct CompareInfo {
    pred: Predicate,
    left: Operand,
    right: Operand,
}

/// Builds a graph from one function of the external stream. Any error
/// means the graph contents are unspecified and must not be used.
pub fn from_stream(stream: &FunctionStream) -> Result<Graph, ImportError> {
    Importer::new(stream).run()
}

struct Importer<'a> {
    stream: &'a FunctionStream,
    graph: Graph,
    // value identity -> graph node
    value_node: HashMap<ValueId, usize>,
    // float constant (by bit pattern) -> graph node
    const_node: HashMap<u64, usize>,
    // pointer identity -> node its pointee maps to (input-vector elements)
    ptr_node: HashMap<ValueId, usize>,
    // pointer identity -> output-vector element index
    out_element: HashMap<ValueId, usize>,
    // compare result identity -> recorded comparison
    compare: HashMap<ValueId, CompareInfo>,
    // dependent slot -> node (0 = not stored yet)
    dependent: Vec<usize>,
    // last node handed out; the next result gets result_node + 1
    result_node: usize,
}

impl<'a> Importer<'a> {
    fn new(stream: &'a FunctionStream) -> Self {
        Self {
            stream,
            graph: Graph::new(),
            value_node: HashMap::new(),
            const_node: HashMap::new(),
            ptr_node: HashMap::new(),
            out_element: HashMap::new(),
            compare: HashMap::new(),
            dependent: vec![0; stream.n_dependent],
            result_node: 0,
        }
    }

    fn run(mut self) -> Result<Graph, ImportError> {
        self.graph.initialize();
        self.graph.set_function_name(&self.stream.function_name);
        self.graph.set_n_dynamic(self.stream.n_dynamic);
        self.graph.set_n_independent(self.stream.n_independent);

        // Pass 1: number the float constants in first-occurrence order.
        let n_input = self.stream.n_dynamic + self.stream.n_independent;
        for instr in &self.stream.instrs {
            for operand in instr.kind.operands() {
                if let Operand::FloatConst(c) = operand {
                    let bits = c.to_bits();
                    if !self.const_node.contains_key(&bits) {
                        let node = 1 + n_input + self.graph.n_constant();
                        self.const_node.insert(bits, node);
                        self.graph.push_constant(*c);
                    }
                }
            }
        }

        // Loading straight through the input pointer yields node 1; the
        // output pointer itself designates dependent slot 0.
        self.ptr_node.insert(self.stream.input_ptr(), 1);
        self.out_element.insert(self.stream.output_ptr(), 0);

        // Pass 2: translate in program order.
        self.result_node = n_input + self.graph.n_constant();
        for instr in &self.stream.instrs {
            self.translate(instr.result, &instr.kind)?;
        }

        for (i, &node) in self.dependent.iter().enumerate() {
            if node == 0 {
                return Err(ImportError::MissingStore(i));
            }
            self.graph.push_dependent(node);
        }
        Ok(self.graph)
    }

    /// Node an operand resolves to, if it has one.
    fn resolve(&self, operand: &Operand) -> Option<usize> {
        match operand {
            Operand::Value(id) => self.value_node.get(id).copied(),
            Operand::FloatConst(c) => self.const_node.get(&c.to_bits()).copied(),
            Operand::IntConst(_) => None,
        }
    }

    fn resolve_or(&self, operand: &Operand, context: &'static str) -> Result<usize, ImportError> {
        self.resolve(operand)
            .ok_or(ImportError::UndefinedOperand(context))
    }

    /// Allocates the node for a value-producing instruction result.
    fn alloc_result(&mut self, result: ValueId) {
        self.result_node += 1;
        self.value_node.insert(result, self.result_node);
    }

    fn translate(&mut self, result: ValueId, kind: &InstrKind) -> Result<(), ImportError> {
        match kind {
            InstrKind::Load { ptr } => {
                // The result aliases whatever node the pointer maps to.
                let node = match ptr {
                    Operand::Value(id) => self.ptr_node.get(id).copied(),
                    _ => None,
                };
                let node = node.ok_or(ImportError::UnmappedLoadPointer)?;
                self.value_node.insert(result, node);
            }

            InstrKind::ElementOffset { base, index } => {
                let base_id = match base {
                    Operand::Value(id) => *id,
                    _ => return Err(ImportError::UnsupportedOffsetBase),
                };
                if base_id == self.stream.output_ptr() {
                    // Only used by stores; remember the slot.
                    self.out_element.insert(result, *index);
                } else if base_id == self.stream.input_ptr() {
                    // Element 0 of the input vector is node 1.
                    self.ptr_node.insert(result, index + 1);
                } else {
                    // No general pointer-aliasing support.
                    return Err(ImportError::UnsupportedOffsetBase);
                }
            }

            InstrKind::Store { value, ptr } => {
                let node = self.resolve_or(value, "store")?;
                let index = match ptr {
                    Operand::Value(id) => self.out_element.get(id).copied(),
                    _ => None,
                };
                let index = index.ok_or(ImportError::UnmappedStorePointer)?;
                if index >= self.dependent.len() {
                    return Err(ImportError::StoreOutOfRange {
                        index,
                        n_dependent: self.dependent.len(),
                    });
                }
                if self.dependent[index] != 0 {
                    return Err(ImportError::DuplicateStore(index));
                }
                self.dependent[index] = node;
            }

            InstrKind::FloatBinary { op, left, right } => {
                let code = match op {
                    FloatBinOp::Add => OpCode::Add,
                    FloatBinOp::Sub => OpCode::Sub,
                    FloatBinOp::Mul => OpCode::Mul,
                    FloatBinOp::Div => OpCode::Div,
                };
                let l = self.resolve_or(left, "arithmetic")?;
                let r = self.resolve_or(right, "arithmetic")?;
                self.graph.push_operator(code, &[l, r]);
                self.alloc_result(result);
            }

            InstrKind::FloatNeg { value } => {
                let v = self.resolve_or(value, "negate")?;
                self.graph.push_operator(OpCode::Neg, &[v]);
                self.alloc_result(result);
            }

            InstrKind::Call { callee, args } => {
                self.translate_call(result, callee, args)?;
            }

            InstrKind::FloatCompare { pred, left, right }
            | InstrKind::IntCompare { pred, left, right } => {
                // No node; consumed later by BoolCombine or Select.
                self.compare.insert(
                    result,
                    CompareInfo {
                        pred: *pred,
                        left: *left,
                        right: *right,
                    },
                );
            }

            InstrKind::BoolCombine { operands } => {
                for operand in operands {
                    let info = match operand {
                        Operand::Value(id) => match self.compare.get(id) {
                            Some(info) => info.clone(),
                            // Not a comparison (e.g. the error-code flag).
                            None => continue,
                        },
                        _ => continue,
                    };
                    // Order-swapping mapping: the upstream lowering negated
                    // the branch condition, so the recorded operator is the
                    // predicate's complement over swapped operands.
                    let code = match info.pred {
                        Predicate::Ne => OpCode::CompEq,
                        Predicate::Lt => OpCode::CompLe,
                        Predicate::Le => OpCode::CompLt,
                        Predicate::Eq => OpCode::CompNe,
                        other => {
                            return Err(ImportError::UnmappedPredicate {
                                predicate: other.name(),
                                context: "combined comparison",
                            })
                        }
                    };
                    let right = self.resolve_or(&info.right, "combined comparison")?;
                    let left = self.resolve_or(&info.left, "combined comparison")?;
                    self.graph.push_operator(code, &[right, left]);
                    // no node in the graph for this operation
                }
            }

            InstrKind::Select {
                cond,
                if_true,
                if_false,
                float,
            } => {
                if !*float {
                    // Integer select belongs to the error-code path.
                    return Ok(());
                }
                let info = match cond {
                    Operand::Value(id) => self.compare.get(id).cloned(),
                    _ => None,
                };
                let info = info.ok_or(ImportError::MissingCompare)?;
                // Direct mapping, no operand swap.
                let code = match info.pred {
                    Predicate::Eq => OpCode::CexpEq,
                    Predicate::Le => OpCode::CexpLe,
                    Predicate::Lt => OpCode::CexpLt,
                    other => {
                        return Err(ImportError::UnmappedPredicate {
                            predicate: other.name(),
                            context: "conditional expression",
                        })
                    }
                };
                let mut args: SmallVec<[usize; 4]> = SmallVec::new();
                args.push(self.resolve_or(&info.left, "conditional expression")?);
                args.push(self.resolve_or(&info.right, "conditional expression")?);
                args.push(self.resolve_or(if_true, "conditional expression")?);
                args.push(self.resolve_or(if_false, "conditional expression")?);
                self.graph.push_operator(code, &args);
                self.alloc_result(result);
            }

            // Only present to implement the error-code early return.
            InstrKind::Branch | InstrKind::Return => {}

            InstrKind::Other { name } => {
                return Err(ImportError::UnsupportedInstruction(name.clone()));
            }
        }
        Ok(())
    }

    fn translate_call(
        &mut self,
        result: ValueId,
        callee: &str,
        args: &[Operand],
    ) -> Result<(), ImportError> {
        if let Some(bare) = callee.strip_prefix("discrete_") {
            if args.len() != 1 {
                return Err(ImportError::CalleeArity {
                    name: callee.into(),
                    found: args.len(),
                    expected: 1,
                });
            }
            let value = self.resolve_or(&args[0], "discrete call")?;
            let index = match self.graph.discrete_name_index(bare) {
                Some(i) => i,
                None => self.graph.push_discrete_name(bare),
            };
            self.graph.push_operator(OpCode::Discrete, &[index, value]);
            self.alloc_result(result);
            return Ok(());
        }

        let code = math_op(callee).ok_or_else(|| ImportError::UnknownCallee(callee.into()))?;
        if args.len() != code.n_arg() {
            return Err(ImportError::CalleeArity {
                name: callee.into(),
                found: args.len(),
                expected: code.n_arg(),
            });
        }
        let mut nodes: SmallVec<[usize; 4]> = SmallVec::new();
        for arg in args {
            nodes.push(self.resolve_or(arg, "call")?);
        }
        self.graph.push_operator(code, &nodes);
        self.alloc_result(result);
        Ok(())
    }
}

/// Fixed callee-name table. Closed: nothing beyond the operator set is
/// inferred from a name.
fn math_op(name: &str) -> Option<OpCode> {
    let code = match name {
        "acos" => OpCode::Acos,
        "acosh" => OpCode::Acosh,
        "asin" => OpCode::Asin,
        "asinh" => OpCode::Asinh,
        "atan" => OpCode::Atan,
        "atanh" => OpCode::Atanh,
        "cos" => OpCode::Cos,
        "cosh" => OpCode::Cosh,
        "erf" => OpCode::Erf,
        "erfc" => OpCode::Erfc,
        "exp" => OpCode::Exp,
        "expm1" => OpCode::Expm1,
        "log1p" => OpCode::Log1p,
        "log" => OpCode::Log,
        "sin" => OpCode::Sin,
        "sinh" => OpCode::Sinh,
        "sqrt" => OpCode::Sqrt,
        "tan" => OpCode::Tan,
        "tanh" => OpCode::Tanh,
        "pow" => OpCode::Pow,
        "azmul" => OpCode::Azmul,
        "fabs" => OpCode::Abs,
        "sign" => OpCode::Sign,
        _ => return None,
    };
    Some(code)
}
