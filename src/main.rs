use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    stitchperfect::cli::main()
}
