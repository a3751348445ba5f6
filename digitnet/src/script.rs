//! Line-oriented architecture scripts: one builder operation per line, so
//! a network can be assembled and validated without the interactive editor.
//!
//! ```text
//! # two convolution stages, then a dense head
//! conv2d 15 3 3
//! activation relu
//! max_pool2d 2 2
//! dense 10
//! compile
//! ```
use editor::{BuildError, ModelBuilder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("line {line}: unknown instruction '{instruction}'")]
    UnknownInstruction { line: usize, instruction: String },
    #[error("line {line}: {instruction} expects {expected} argument(s)")]
    WrongArgumentCount {
        line: usize,
        instruction: String,
        expected: usize,
    },
    #[error("line {line}: could not read '{value}' as a whole number")]
    BadNumber { line: usize, value: String },
    #[error("line {line}: {source}")]
    Rejected { line: usize, source: BuildError },
}

/// Applies a script to the builder, line by line. Empty lines and `#`
/// comments are skipped. Stops at the first offending line; edits up to
/// that line remain applied.
pub fn run_script(builder: &mut ModelBuilder, script: &str) -> Result<(), ScriptError> {
    for (idx, raw) in script.lines().enumerate() {
        let line = idx + 1;
        let code = raw.split('#').next().unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }
        let tokens: Vec<&str> = code.split_whitespace().collect();
        let instruction = tokens[0];
        let args = &tokens[1..];

        let result = match instruction {
            "conv2d" => {
                expect_args(line, instruction, args, 3)?;
                builder.add_conv2d(
                    number(line, args[0])?,
                    number(line, args[1])?,
                    number(line, args[2])?,
                )
            }
            "max_pool2d" => {
                expect_args(line, instruction, args, 2)?;
                builder.add_max_pool2d(number(line, args[0])?, number(line, args[1])?)
            }
            "dense" => {
                expect_args(line, instruction, args, 1)?;
                builder.add_dense(number(line, args[0])?)
            }
            "activation" => {
                expect_args(line, instruction, args, 1)?;
                builder.add_activation(args[0])
            }
            "dropout" => {
                expect_args(line, instruction, args, 1)?;
                builder.add_dropout(args[0])
            }
            "batch_norm" => {
                expect_args(line, instruction, args, 0)?;
                builder.add_batch_normalization()
            }
            "compile" => {
                expect_args(line, instruction, args, 0)?;
                builder.add_compile()
            }
            "delete" => {
                expect_args(line, instruction, args, 0)?;
                builder.delete_last_layer()
            }
            "clear" => {
                expect_args(line, instruction, args, 0)?;
                builder.clear();
                Ok(())
            }
            other => {
                return Err(ScriptError::UnknownInstruction {
                    line,
                    instruction: other.to_string(),
                })
            }
        };
        result.map_err(|source| ScriptError::Rejected { line, source })?;
    }
    Ok(())
}

fn expect_args(
    line: usize,
    instruction: &str,
    args: &[&str],
    expected: usize,
) -> Result<(), ScriptError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ScriptError::WrongArgumentCount {
            line,
            instruction: instruction.to_string(),
            expected,
        })
    }
}

fn number(line: usize, value: &str) -> Result<usize, ScriptError> {
    value.parse().map_err(|_| ScriptError::BadNumber {
        line,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use editor::{LayerKind, Shape};

    #[test]
    fn test_script_builds_documented_sequence() {
        let mut builder = ModelBuilder::new();
        run_script(
            &mut builder,
            "# a small network\n\
             conv2d 15 3 3\n\
             activation relu\n\
             max_pool2d 2 2\n\
             dense 10\n\
             compile\n",
        )
        .unwrap();

        assert!(builder.is_compiled());
        assert_eq!(builder.current_shape(), Shape::flat(10));
        let kinds: Vec<_> = builder.descriptors().iter().map(|d| d.kind()).collect();
        assert!(matches!(kinds[1], LayerKind::Conv2d { filters: 15, .. }));
        // dense auto-flattened, compile auto-appended softmax
        assert_eq!(kinds[4], &LayerKind::Flatten);
        assert_eq!(kinds.last().unwrap(), &&LayerKind::Compile);
    }

    #[test]
    fn test_unknown_instruction_names_the_line() {
        let mut builder = ModelBuilder::new();
        let err = run_script(&mut builder, "conv2d 15 3 3\nupsample 2\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "line 2: unknown instruction 'upsample'"
        );
    }

    #[test]
    fn test_rejected_edit_names_the_line() {
        let mut builder = ModelBuilder::new();
        let err = run_script(&mut builder, "conv2d 3 30 30\n").unwrap_err();
        assert!(matches!(err, ScriptError::Rejected { line: 1, .. }));
        // the builder keeps the state from before the offending line
        assert_eq!(builder.descriptors().len(), 1);
    }

    #[test]
    fn test_wrong_argument_count() {
        let mut builder = ModelBuilder::new();
        let err = run_script(&mut builder, "max_pool2d 2\n").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::WrongArgumentCount { expected: 2, .. }
        ));
    }

    #[test]
    fn test_bad_number() {
        let mut builder = ModelBuilder::new();
        let err = run_script(&mut builder, "dense ten\n").unwrap_err();
        assert!(matches!(err, ScriptError::BadNumber { line: 1, .. }));
    }
}
