/// One fixed test case of a problem
///
/// `input` doubles as the argument list of the generated call, so it must be
/// a valid Python expression list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCase {
    pub input: &'static str,
    pub expected: &'static str,
}

/// A judged problem: the function the submission must define and its cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Problem {
    pub function_name: &'static str,
    pub arity: usize,
    pub cases: &'static [TestCase],
}

pub static TWO_SUM: Problem = Problem {
    function_name: "two_sum",
    arity: 2,
    cases: &[
        TestCase {
            input: "[2,7,11,15],9",
            expected: "[0, 1]",
        },
        TestCase {
            input: "[3,2,4],6",
            expected: "[1, 2]",
        },
        TestCase {
            input: "[3,3],6",
            expected: "[0, 1]",
        },
    ],
};

impl Problem {
    /// The prefix a line must start with (after indentation) to define the function
    pub fn definition_prefix(&self) -> String {
        format!("def {}(", self.function_name)
    }
}
