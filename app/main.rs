use std::{env::current_dir, path::PathBuf, process::ExitCode};

use chrono::Local;
use clap::{Parser, Subcommand};
use lib::{
    commit::Commit,
    error::{Error, Missing},
    merge::MergeOutcome,
    object_id::ObjectId,
    repository::{Repository, Switched},
    staging::{Removal, Staged},
    status::{Modification, Status},
};

#[derive(Parser, Debug)]
struct Arguments {
    #[arg(long, global = true, help = "repository root, defaults to the current directory")]
    repo: Option<PathBuf>,
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(about = "initialize a brand new repository")]
    Init,
    #[clap(about = "stage a file's current contents")]
    Add { path: String },
    #[clap(about = "record the staged changes")]
    Commit { message: String },
    #[clap(about = "restore a file from the tip, or from a commit: restore <commit> -- <path>")]
    Restore {
        target: Option<String>,
        #[arg(last = true)]
        path: Option<String>,
    },
    #[clap(about = "show the history of the current branch")]
    Log,
    #[clap(name = "global-log", about = "show every commit ever made")]
    GlobalLog,
    #[clap(about = "unstage a file, or stage its removal")]
    Rm { path: String },
    #[clap(about = "show branches, staged changes and untracked files")]
    Status,
    #[clap(about = "print the ids of commits with this exact message")]
    Find { message: String },
    #[clap(about = "create a branch at the current commit")]
    Branch { name: String },
    #[clap(name = "rm-branch", about = "delete a branch pointer")]
    RmBranch { name: String },
    #[clap(about = "check out another branch")]
    Switch { branch: String },
    #[clap(about = "check out a commit and move the current branch to it")]
    Reset { commit: String },
    #[clap(about = "merge another branch into the current one")]
    Merge { branch: String },
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Arguments::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("command failed: {:?}", err);
            println!("{}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(args: Arguments) -> Result<(), Error> {
    let root = match args.repo {
        Some(root) => root,
        None => current_dir()?,
    };
    if matches!(args.cmd, Command::Init) {
        Repository::init(&root)?;
        return Ok(());
    }
    let mut repo = Repository::open(&root)?;
    match args.cmd {
        Command::Init => {}
        Command::Add { path } => {
            if repo.add(&path)? == Staged::AlreadyStaged {
                println!("File {} is already staged with the same content.", path);
            }
        }
        Command::Commit { message } => {
            repo.commit(&message)?;
        }
        Command::Restore { target, path } => match (target, path) {
            (Some(path), None) | (None, Some(path)) => repo.restore(&path)?,
            (Some(commit), Some(path)) => repo.restore_from(&commit, &path)?,
            (None, None) => println!("Incorrect operands."),
        },
        Command::Log => {
            for (id, commit) in repo.log()? {
                print_commit(id, &commit);
            }
        }
        Command::GlobalLog => {
            for (id, commit) in repo.global_log()? {
                print_commit(id, &commit);
            }
        }
        Command::Rm { path } => {
            if repo.rm(&path)? == Removal::Unstaged {
                log::debug!("{} unstaged", path);
            }
        }
        Command::Status => print_status(&repo.status()?),
        Command::Find { message } => {
            let ids = repo.find(&message)?;
            if ids.is_empty() {
                println!("Found no commit with that message.");
            }
            for id in ids {
                println!("{}", id);
            }
        }
        Command::Branch { name } => repo.branch(&name)?,
        Command::RmBranch { name } => repo.rm_branch(&name)?,
        Command::Switch { branch } => {
            if repo.switch(&branch)? == Switched::AlreadyCurrent {
                println!("No need to switch to the current branch.");
            }
        }
        Command::Reset { commit } => {
            repo.reset(&commit)?;
        }
        Command::Merge { branch } => match repo.merge(&branch)? {
            MergeOutcome::FastForwarded(_) => println!("Current branch fast-forwarded."),
            MergeOutcome::Merged { conflict: true, .. } => {
                println!("Encountered a merge conflict.")
            }
            MergeOutcome::Merged { conflict: false, .. } => {}
        },
    }
    Ok(())
}

fn print_commit(id: ObjectId, commit: &Commit) {
    println!("===");
    println!("commit {}", id);
    if let (Some(parent), Some(merge_parent)) = (commit.parent, commit.merge_parent) {
        println!(
            "Merge: {} {}",
            parent.abbreviate(7),
            merge_parent.abbreviate(7)
        );
    }
    let date = commit.timestamp.with_timezone(&Local);
    println!("Date: {}", date.format("%a %b %-d %H:%M:%S %Y %z"));
    println!("{}", commit.message);
    println!();
}

fn print_section(title: &str, lines: impl IntoIterator<Item = String>) {
    println!("=== {} ===", title);
    for line in lines {
        println!("{}", line);
    }
    println!();
}

fn print_status(status: &Status) {
    print_section(
        "Branches",
        status.branches.iter().map(|branch| {
            if *branch == status.current {
                format!("*{}", branch)
            } else {
                branch.clone()
            }
        }),
    );
    print_section("Staged Files", status.staged.iter().cloned());
    print_section("Removed Files", status.removed.iter().cloned());
    print_section(
        "Modifications Not Staged For Commit",
        status.unstaged.iter().map(|(path, modification)| {
            let kind = match modification {
                Modification::Modified => "modified",
                Modification::Deleted => "deleted",
            };
            format!("{} ({})", path, kind)
        }),
    );
    print_section("Untracked Files", status.untracked.iter().cloned());
}

/// The fixed text shown for each failure.
fn describe(err: &Error) -> String {
    let text = match err {
        Error::NotARepository(_) => "Not in an initialized rev directory.",
        Error::AlreadyInitialized(_) => {
            "A rev version-control system already exists in the current directory."
        }
        Error::NotFound(Missing::Commit(_)) | Error::Ambiguous(_) => {
            "No commit with that id exists."
        }
        Error::NotFound(Missing::Branch(_)) | Error::NoSuchBranch(_) => {
            "A branch with that name does not exist."
        }
        Error::NotFound(Missing::File(_)) => "File does not exist.",
        Error::AlreadyExists(_) => "A branch with that name already exists.",
        Error::InvalidBranchName(_) => "Invalid branch name.",
        Error::CannotDeleteActive(_) => "Cannot remove the current branch.",
        Error::NothingToRemove(_) => "No reason to remove the file.",
        Error::UncommittedChanges => "You have uncommitted changes.",
        Error::SelfMerge => "Cannot merge a branch with itself.",
        Error::AlreadyAncestor => "Given branch is an ancestor of the current branch.",
        Error::UntrackedConflict(_) => {
            "There is an untracked file in the way; delete it, or add and commit it first."
        }
        Error::FileNotInCommit(_) => "File does not exist in that commit.",
        Error::EmptyStagingArea => "No changes added to the commit.",
        Error::EmptyMessage => "Please enter a commit message.",
        Error::NotFound(Missing::Blob(_)) | Error::IO(_) | Error::Serde(_) => {
            return err.to_string()
        }
    };
    String::from(text)
}
