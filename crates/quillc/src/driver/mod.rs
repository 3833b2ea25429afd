//! Compilation driver and pipeline orchestration

use crate::common::{CompileResult, Diagnostics, LineIndex};
use crate::frontend::{self, ast, FrontendConfig};
use crate::ir::IrModule;
use crate::sema;

/// Output of compiling one source file
#[derive(Debug)]
pub struct Compilation {
    pub module: IrModule,
    pub diagnostics: Diagnostics,
    /// Requested debug dumps, as (title, text)
    pub dumps: Vec<(&'static str, String)>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Compilation pipeline: parse, analyze, lower
#[derive(Debug, Default)]
pub struct Pipeline;

impl Pipeline {
    pub fn new() -> Self {
        Self
    }

    /// Compile source code to IR
    ///
    /// Lexer and parser errors stop the pipeline and are returned as `Err`.
    /// Semantic errors are collected in the returned diagnostics; the module
    /// then holds everything that did lower.
    pub fn compile_source(
        &self,
        source: &str,
        filename: &str,
        config: &FrontendConfig,
    ) -> CompileResult<Compilation> {
        let module_name = frontend::module_name(filename);
        let mut dumps = Vec::new();
        if config.dump_tokens {
            dumps.push(("Tokens", frontend::dump_tokens(source)?));
        }

        let syntax = {
            let _span = tracing::info_span!("parse", module = module_name).entered();
            frontend::parse(source)?
        };
        tracing::debug!(items = syntax.items.len(), "parsed");
        if config.dump_ast {
            let index = LineIndex::new(source);
            dumps.push(("AST", ast::dump_tree(syntax.node(), &index)));
        }

        let analysis = {
            let _span = tracing::info_span!("analyze", module = module_name).entered();
            sema::analyze(&syntax, module_name)
        };
        if config.dump_scopes {
            dumps.push(("Scopes", analysis.scopes.dump()));
        }
        if config.dump_ir {
            dumps.push(("IR", analysis.module.to_string()));
        }

        if config.verbose {
            tracing::info!(
                functions = analysis.module.functions.len(),
                structs = analysis.module.structs.len(),
                errors = analysis.diagnostics.len(),
                "analysis finished"
            );
        }

        Ok(Compilation {
            module: analysis.module,
            diagnostics: analysis.diagnostics,
            dumps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorKind;

    #[test]
    fn test_compile_collects_dumps() {
        let config = FrontendConfig {
            dump_scopes: true,
            dump_ir: true,
            ..FrontendConfig::default()
        };
        let result = Pipeline::new()
            .compile_source("func main() => int { return 0 }", "demo.ql", &config)
            .unwrap();
        assert!(!result.has_errors());
        let titles: Vec<&str> = result.dumps.iter().map(|(title, _)| *title).collect();
        assert_eq!(titles, vec!["Scopes", "IR"]);
        assert!(result.dumps[0].1.contains("main"));
        assert!(result.module.function("main").is_some());
    }

    #[test]
    fn test_parse_errors_stop_the_pipeline() {
        let error = Pipeline::new()
            .compile_source("func main( {", "demo.ql", &FrontendConfig::default())
            .unwrap_err();
        assert_eq!(error.kind, ErrorKind::Parser);
    }

    #[test]
    fn test_semantic_errors_are_collected() {
        let result = Pipeline::new()
            .compile_source(
                "func a() => int { return nope }\nfunc b() => int { return 1 }",
                "demo.ql",
                &FrontendConfig::default(),
            )
            .unwrap();
        assert_eq!(result.diagnostics.count(ErrorKind::CannotFind), 1);
        assert!(result.module.function("b").is_some_and(|f| !f.is_declaration()));
    }
}
