mod compiler;

use compiler::emitter::WasmEmitter;
use compiler::parser::SchwaParser;
use compiler::Compiler;

use clap::Parser;

type SOURCE_PARSER = SchwaParser;
type GENERATOR = WasmEmitter;

/// Command line interface for the Schwa compiler.
#[derive(Parser)]
struct SchwaCliOptions {
    /// Path of the Schwa source file to compile.
    #[clap(parse(from_os_str))]
    path: std::path::PathBuf,

    /// Path to the output Wasm binary, default is `<path_filename>.wasm`.
    #[clap(short, long, parse(from_os_str))]
    output: Option<std::path::PathBuf>,

    /// Number of 64KiB Wasm memory pages to reserve for mapped globals.
    #[clap(long, default_value_t = 1)]
    pages: u32,

    /// Write the compiled module to stdout instead of a file.
    #[clap(long, action)]
    stdout: bool,

    /// Re-serialize the parsed source back through the formatter and exit,
    /// without analysing or emitting Wasm.
    #[clap(long, action)]
    format: bool,
}

impl SchwaCliOptions {
    fn derive_defaults(mut self) -> Self {
        if self.output.is_none() {
            self.output = Some(self.path.with_extension("wasm"));
        }
        self
    }
}

fn main() {
    let cli_args = SchwaCliOptions::parse().derive_defaults();
    let source_path = cli_args.path.as_path();

    if cli_args.format {
        let compiler: Compiler<SOURCE_PARSER, GENERATOR> = Compiler::default();
        let source = match std::fs::read_to_string(source_path) {
            Ok(source) => source,
            Err(why) => {
                eprintln!("Could not read {}: {}", source_path.display(), why);
                std::process::exit(exitcode::IOERR);
            }
        };
        print!("{}", compiler.format_str(&source));
        std::process::exit(exitcode::OK);
    }

    let compiler: Compiler<SOURCE_PARSER, GENERATOR> = Compiler::default().set_pages(cli_args.pages);

    let result = if cli_args.stdout {
        compiler.compile(source_path).map(|output| {
            if let Some(wasm) = &output.wasm {
                use std::io::Write;
                std::io::stdout().write_all(wasm).expect("write to stdout");
            }
            output
        })
    } else {
        let dest_path = cli_args.output.unwrap();
        compiler.compile_and_save(source_path, dest_path.as_path())
    };

    match result {
        Ok(output) => {
            for diagnostic in &output.diagnostics {
                eprintln!("{}", diagnostic);
            }
            if output.has_errors() {
                println!("Compile Error: {} diagnostic(s) reported", output.diagnostics.len());
                std::process::exit(exitcode::DATAERR);
            }
            if !cli_args.stdout {
                println!("Compile success!");
            }
            std::process::exit(exitcode::OK);
        }
        Err(why) => {
            println!("Compile Error: {:?}", why);
            std::process::exit(exitcode::SOFTWARE);
        }
    }
}
