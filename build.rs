use regex::Regex;
use std::fs;
use std::process::Command;

fn git_output(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|out| out.trim().to_string())
        .filter(|out| !out.is_empty())
        .unwrap_or_else(|| "undetermined".into())
}

fn main() {
    println!("cargo:rustc-env=GIT_HASH={}", git_output(&["rev-parse", "HEAD"]));
    println!(
        "cargo:rustc-env=GIT_COUNT={}",
        git_output(&["rev-list", "--count", "HEAD"])
    );
    println!("cargo:rerun-if-changed=.git/HEAD");

    if let Ok(head) = fs::read_to_string(".git/HEAD") {
        let re = Regex::new(r"ref: (.*)").unwrap();
        if let Some(captures) = re.captures(&head) {
            println!(
                "cargo:rerun-if-changed=.git/{}",
                captures.get(1).map_or("", |m| m.as_str())
            );
        }
    }
}
