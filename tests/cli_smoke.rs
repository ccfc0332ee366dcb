use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn taskchat_help_works() {
    Command::cargo_bin("taskchat")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Task and project tracking driven by chat intents"));
}

#[test]
fn subcommand_help_works() {
    let subcommands: [&[&str]; 10] = [
        &["init"],
        &["user"],
        &["user", "register"],
        &["user", "login"],
        &["user", "logout"],
        &["user", "whoami"],
        &["chat", "send"],
        &["chat", "apply"],
        &["chat", "history"],
        &["view"],
    ];

    for args in subcommands {
        Command::cargo_bin("taskchat")
            .expect("binary")
            .args(args)
            .arg("--help")
            .assert()
            .success();
    }
}
