use std::process::ExitCode;

fn main() -> anyhow::Result<ExitCode> {
    unit_converter_lib::run()
}
