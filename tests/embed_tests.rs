use git_replica::embed::{embed_mirrors, embed_on_branch, embed_on_branch_parallel, embed_on_branch_reset};
use git_replica::merge::pass_filter;
use git_replica::repo::init_plain;
use git_replica::{Address, Branch, Ns, Result, Url};

mod common;

use common::{branch_tree_contains, populate, DebugTempDir};

#[test]
fn embed_and_reembed_remotes() -> Result<()> {
    let ctx = common::test_context();
    let t = DebugTempDir::new()?;
    let (d1, d2, d3) = (t.path().join("1"), t.path().join("2"), t.path().join("3"));
    let r1 = init_plain(&d1, false)?;
    let r2 = init_plain(&d2, false)?;
    let r3 = init_plain(&d3, false)?;

    let addrs = [
        Address::new(Url::from(d2.as_path()), Branch::new("brew")),
        Address::new(Url::from(d3.as_path()), Branch::new("brew")),
    ];
    let caches = [Branch::new("cache2"), Branch::new("cache3")];
    let to_ns = [Ns::new(["embedded", "r2"]), Ns::new(["embedded", "r3"])];
    let brew = Branch::new("brew");

    populate(&ctx, &r1, "brew", "ok1")?;
    populate(&ctx, &r2, "brew", "ok2")?;
    populate(&ctx, &r3, "brew", "ok3")?;

    let first = embed_on_branch_reset(&ctx, &r1, &addrs, &caches, &brew, &to_ns, true, &pass_filter)?;
    let commit = r1.find_commit(first)?;
    assert_eq!(commit.parent_count(), 3);
    assert!(branch_tree_contains(&r1, "brew", "ok1"));
    assert!(branch_tree_contains(&r1, "brew", "embedded/r2/ok2"));
    assert!(branch_tree_contains(&r1, "brew", "embedded/r3/ok3"));
    // the reset variant also materializes the working tree
    assert!(r1.workdir().unwrap().join("embedded/r2/ok2").exists());

    populate(&ctx, &r1, "brew", "ha1")?;
    populate(&ctx, &r2, "brew", "ha2")?;
    populate(&ctx, &r3, "brew", "ha3")?;

    embed_on_branch_reset(&ctx, &r1, &addrs, &caches, &brew, &to_ns, true, &pass_filter)?;
    for path in [
        "ok1",
        "ha1",
        "embedded/r2/ok2",
        "embedded/r2/ha2",
        "embedded/r3/ok3",
        "embedded/r3/ha3",
    ] {
        assert!(branch_tree_contains(&r1, "brew", path), "missing {path}");
    }
    Ok(())
}

#[test]
fn unreachable_sources_are_skipped() -> Result<()> {
    let ctx = common::test_context();
    let t = DebugTempDir::new()?;
    let good_dir = t.path().join("good");
    let good = init_plain(&good_dir, false)?;
    populate(&ctx, &good, "main", "ok")?;

    let host = init_plain(&t.path().join("host"), false)?;
    populate(&ctx, &host, "main", "host")?;

    let addrs = [
        Address::new(Url::from(good_dir.as_path()), Branch::main()),
        Address::new(Url::from(t.path().join("nope").as_path()), Branch::main()),
    ];
    let caches = [Branch::new("cache-good"), Branch::new("cache-nope")];
    let to_ns = [Ns::new(["embedded", "good"]), Ns::new(["embedded", "nope"])];

    let commit_id = embed_on_branch(
        &ctx,
        &host,
        &addrs,
        &caches,
        &Branch::main(),
        &to_ns,
        false,
        &pass_filter,
    )?;
    let commit = host.find_commit(commit_id)?;
    // host parent plus the one reachable source
    assert_eq!(commit.parent_count(), 2);
    assert!(branch_tree_contains(&host, "main", "embedded/good/ok"));
    assert!(!branch_tree_contains(&host, "main", "embedded/nope"));
    Ok(())
}

#[test]
fn parallel_fetch_embeds_all_sources() -> Result<()> {
    let ctx = common::test_context();
    let t = DebugTempDir::new()?;

    let mut addrs = Vec::new();
    let mut caches = Vec::new();
    let mut to_ns = Vec::new();
    for i in 0..8 {
        let dir = t.path().join(format!("r{i}"));
        let repo = init_plain(&dir, false)?;
        populate(&ctx, &repo, "main", &format!("ok{i}"))?;
        addrs.push(Address::new(Url::from(dir.as_path()), Branch::main()));
        caches.push(Branch::new("cache").sub(format!("r{i}")));
        to_ns.push(Ns::new(["embedded".to_string(), format!("r{i}")]));
    }

    let host = init_plain(&t.path().join("host"), false)?;
    populate(&ctx, &host, "main", "host")?;

    let commit_id = embed_on_branch_parallel(
        &ctx,
        &host,
        &addrs,
        &caches,
        &Branch::main(),
        &to_ns,
        true,
        &pass_filter,
        4,
    )?;
    let commit = host.find_commit(commit_id)?;
    assert_eq!(commit.parent_count(), 9);
    for i in 0..8 {
        let path = format!("embedded/r{i}/ok{i}");
        assert!(branch_tree_contains(&host, "main", &path), "missing {path}");
    }
    Ok(())
}

#[test]
fn mirrors_land_under_their_names() -> Result<()> {
    let ctx = common::test_context();
    let t = DebugTempDir::new()?;

    let a_dir = t.path().join("a");
    let a = init_plain(&a_dir, false)?;
    populate(&ctx, &a, "main", "okA")?;
    let b_dir = t.path().join("b");
    let b = init_plain(&b_dir, false)?;
    populate(&ctx, &b, "main", "okB")?;

    let host = init_plain(&t.path().join("host"), false)?;
    populate(&ctx, &host, "main", "host")?;

    let commit_id = embed_mirrors(
        &ctx,
        &host,
        &["a".to_string(), "b".to_string()],
        &[
            Address::new(Url::from(a_dir.as_path()), Branch::main()),
            Address::new(Url::from(b_dir.as_path()), Branch::main()),
        ],
        &Branch::main(),
        &Ns::new(["mirrors"]),
    )?;
    let commit = host.find_commit(commit_id)?;
    assert_eq!(commit.parent_count(), 3);
    assert!(branch_tree_contains(&host, "main", "mirrors/a/okA"));
    assert!(branch_tree_contains(&host, "main", "mirrors/b/okB"));
    Ok(())
}
