fn main() -> Result<(), Box<dyn std::error::Error>> {
    multichat::cli::main()
}
