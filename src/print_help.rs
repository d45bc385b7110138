use colored::Colorize;

pub fn print_help() {
    println!("{:━^60}", " IMAGEGEN BRIDGE ".yellow());
    println!("Usage:");
    println!("  {} [command] <argument>", "bridge".bold().green());
    println!("\nCommands:");
    println!(
        "  {}   Serve tool calls as JSON-RPC lines on stdin/stdout.",
        "serve".bold().green()
    );
    println!(
        "  {}       Generate an image with the default image model.",
        "d".bold().red()
    );
    println!(
        "  {}       Generate an image with a chosen model.",
        "i".bold().cyan()
    );
    println!(
        "  {}       Analyze an image with a vision model.",
        "v".bold().magenta()
    );
    println!(
        "  {}     Display this help message.",
        "-h, -help".bold().blue()
    );
    println!("\nArguments:");
    println!("  {}  A text prompt.", "d <prompt>".bold().red());
    println!(
        "  {}  A model id and a text prompt.",
        "i <model> <prompt>".bold().cyan()
    );
    println!(
        "  {}  A path or URL to an image and optional instructions.",
        "v <image> [instructions]".bold().magenta()
    );
    println!("\nEnvironment:");
    println!("  {}  API key (required).", "OPENAI_API_KEY".bold());
    println!("  {}  API base URL.", "OPENAI_BASE_URL".bold());
    println!("  {}  Where generated images are saved.", "IMAGE_OUTPUT_DIR".bold());
    println!("\nExamples:");
    println!(
        "  {} An astronaut on Mars in a rusty spacesuit holding a crab",
        "bridge d".bold().red()
    );
    println!(
        "  {} google/gemini-2.5-flash-image A lighthouse at dusk",
        "bridge i".bold().cyan()
    );
    println!(
        "  {} rust_astronaut.jpg What colors are in this image?",
        "bridge v".bold().magenta()
    );
    println!("{:━^60}", "".yellow());
}
