//! The pipeline driver: source text in, C translation unit out.
//!
//! Each stage runs to completion and hands its diagnostics forward, so
//! a single invocation reports as many problems as it can find. Code
//! generation only runs when every earlier stage finished clean.

use crate::codegen_c::generate;
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::lexer::lex;
use crate::parser::parse;
use crate::typecheck::check;

#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Annotate the generated C with source line comments.
    pub debug: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CompilationArtifact {
    pub c_source: String,
    /// Runtime procedures the unit links against, in declaration-table
    /// order.
    pub runtime_imports: Vec<&'static str>,
    /// Non-fatal diagnostics; the compile succeeded despite them.
    pub warnings: Vec<Diagnostic>,
}

pub fn compile(source: &str, options: CompileOptions) -> Result<CompilationArtifact, CoreError> {
    let lexed = lex(source);
    let parsed = parse(&lexed.tokens);

    let mut diagnostics = lexed.diagnostics;
    diagnostics.extend(parsed.diagnostics);
    let (errors, warnings): (Vec<Diagnostic>, Vec<Diagnostic>) =
        diagnostics.into_iter().partition(Diagnostic::is_error);

    let program = match parsed.program {
        Some(program) if errors.is_empty() => program,
        _ => return Err(CoreError::Syntax { diagnostics: errors }),
    };

    let outcome = check(&program);
    let hir = match outcome.hir {
        Some(hir) => hir,
        // hir is withheld whenever the checker reported anything.
        None => {
            return Err(CoreError::Semantic {
                diagnostics: outcome.diagnostics,
            });
        }
    };

    let unit = generate(&hir, &outcome.table, options.debug);
    Ok(CompilationArtifact {
        c_source: unit.c_source,
        runtime_imports: unit.runtime_imports,
        warnings,
    })
}
