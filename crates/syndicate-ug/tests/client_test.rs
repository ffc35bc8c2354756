//! Client behavior against the in-memory native layer.

use syndicate_ug::testing::MockUg;
use syndicate_ug::{Client, InitOptions, OpenMode, SyndicateError, XattrFlags};

fn client_with(mock: &MockUg) -> Client<MockUg> {
    Client::init(mock.clone(), &InitOptions::new("alice", "v1", "g1").program("ug-test")).unwrap()
}

// === init / shutdown ===

/// Identity options reach UG_init as a getopt-style argv
#[test]
fn test_init_argv() {
    let mock = MockUg::new();
    let client = client_with(&mock);

    assert_eq!(mock.argv(), vec!["ug-test", "-u", "alice", "-v", "v1", "-g", "g1"]);
    assert_eq!(mock.client_flag(), Some(false));
    assert_eq!(mock.live_states(), 1);

    client.shutdown().unwrap();
    assert_eq!(mock.live_states(), 0);
    assert_eq!(mock.count("UG_shutdown"), 1);
}

#[test]
fn test_init_failure() {
    let mock = MockUg::new();
    mock.set_init_fails(true);
    let err = Client::init(mock.clone(), &InitOptions::default()).unwrap_err();
    assert!(matches!(err, SyndicateError::InitFailed));
    assert_eq!(mock.count("UG_shutdown"), 0);
}

/// A client that is never shut down explicitly is shut down on drop
#[test]
fn test_drop_shuts_down_once() {
    let mock = MockUg::new();
    {
        let _client = client_with(&mock);
    }
    assert_eq!(mock.count("UG_shutdown"), 1);
    assert_eq!(mock.live_states(), 0);
}

#[test]
fn test_from_raw_rejects_null() {
    let mock = MockUg::new();
    let err = unsafe { Client::from_raw(mock.clone(), std::ptr::null_mut()) }.unwrap_err();
    assert!(matches!(err, SyndicateError::InvalidArgument(_)));
    assert!(mock.calls().is_empty());
}

#[test]
fn test_identity_and_remaining_args() {
    let mock = MockUg::new();
    mock.set_first_arg_optind(5);
    let opts = InitOptions::new("alice", "v1", "").program("prog");
    let client = Client::init(mock.clone(), &opts).unwrap();

    assert_eq!(client.first_arg_optind().unwrap(), 5);
    assert!(client.remaining_args().unwrap().is_empty());
    assert_eq!(client.owner_id().unwrap(), syndicate_ug::testing::MOCK_OWNER_ID);
    assert_eq!(client.volume_id().unwrap(), syndicate_ug::testing::MOCK_VOLUME_ID);

    mock.set_first_arg_optind(3);
    assert_eq!(client.remaining_args().unwrap(), vec!["-v", "v1"]);
}

// === argument validation ===

/// Invalid arguments never reach native code
#[test]
fn test_validation_makes_no_native_calls() {
    let mock = MockUg::new().with_file("/f", b"x");
    let client = client_with(&mock);
    mock.clear_calls();

    let invalid = |r: Result<(), SyndicateError>| {
        assert!(matches!(r, Err(SyndicateError::InvalidArgument(_))), "{:?}", r);
    };
    invalid(client.stat_raw("").map(drop));
    invalid(client.stat("").map(drop));
    invalid(client.open("", OpenMode::Read).map(drop));
    invalid(client.list_dir("").map(drop));
    invalid(client.mkdir("", None));
    invalid(client.rmdir(""));
    invalid(client.unlink(""));
    invalid(client.rename("/f", ""));
    invalid(client.rename("", "/g"));
    invalid(client.truncate("/f", -1));
    invalid(client.get_xattr("/f", "").map(drop));
    invalid(client.get_xattr("", "user.k").map(drop));
    invalid(client.list_xattr("").map(drop));
    invalid(client.set_xattr("/f", "user.k", b"", XattrFlags::Any));
    invalid(client.set_xattr("/f", "", b"v", XattrFlags::Any));
    invalid(client.remove_xattr("/f", ""));
    invalid(client.vacuum(""));
    invalid(client.stat("/with\0nul").map(drop));

    assert!(mock.calls().is_empty(), "unexpected calls: {:?}", mock.calls());
}

#[test]
fn test_handle_validation_makes_no_native_calls() {
    let mock = MockUg::new().with_file("/f", b"data");
    let client = client_with(&mock);
    let mut fh = client.open("/f", OpenMode::Read).unwrap();
    mock.clear_calls();

    assert!(matches!(fh.seek(-1), Err(SyndicateError::InvalidArgument(_))));
    assert!(matches!(fh.truncate(-5), Err(SyndicateError::InvalidArgument(_))));
    assert!(matches!(fh.read_to_end(0), Err(SyndicateError::InvalidArgument(_))));
    assert_eq!(fh.read(0).unwrap(), Vec::<u8>::new());
    assert_eq!(fh.write(b"").unwrap(), 0);
    assert!(mock.calls().is_empty());
}

// === open ===

#[test]
fn test_open_read_issues_no_create_truncate_or_seek() {
    let mock = MockUg::new().with_file("/f", b"hello");
    let client = client_with(&mock);
    mock.clear_calls();

    let fh = client.open("/f", OpenMode::Read).unwrap();
    assert_eq!(mock.calls(), vec!["UG_open"]);
    fh.close().unwrap();
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_open_read_missing_file() {
    let mock = MockUg::new();
    let client = client_with(&mock);
    let err = client.open("/nope", OpenMode::Read).unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("No such file or directory"));
    assert_eq!(mock.count("UG_create"), 0);
}

#[test]
fn test_open_write_creates_new_file() {
    let mock = MockUg::new();
    let client = client_with(&mock);
    mock.clear_calls();

    let mut fh = client.open("/new", OpenMode::Write).unwrap();
    assert_eq!(mock.calls(), vec!["UG_create"]);
    assert_eq!(mock.mode_of("/new"), Some(0o540));

    assert_eq!(fh.write(b"abc").unwrap(), 3);
    fh.close().unwrap();
    assert_eq!(mock.contents("/new").unwrap(), b"abc");
}

/// Create reports EEXIST: fall back to open, then truncate
#[test]
fn test_open_write_existing_truncates() {
    let mock = MockUg::new().with_file("/f", b"old contents");
    let client = client_with(&mock);
    mock.clear_calls();

    let fh = client.open("/f", OpenMode::Write).unwrap();
    assert_eq!(mock.calls(), vec!["UG_create", "UG_open", "UG_ftruncate"]);
    assert_eq!(mock.contents("/f").unwrap(), b"");
    drop(fh);
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_open_write_truncate_failure_closes_handle() {
    let mock = MockUg::new().with_file("/f", b"old");
    let client = client_with(&mock);
    mock.fail_next("UG_ftruncate", libc::EROFS);

    let err = client.open("/f", OpenMode::Write).unwrap_err();
    assert_eq!(err.errno(), Some(libc::EROFS));
    assert!(err.to_string().starts_with("Failed to truncate a file '/f'"));
    assert_eq!(mock.count("UG_close"), 1);
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_open_create_error_is_returned() {
    let mock = MockUg::new();
    let client = client_with(&mock);
    mock.fail_next("UG_create", libc::EACCES);

    let err = client.open("/f", OpenMode::Write).unwrap_err();
    assert_eq!(err.errno(), Some(libc::EACCES));
    assert_eq!(mock.count("UG_open"), 0);
}

#[test]
fn test_open_append_seeks_to_end() {
    let mock = MockUg::new().with_file("/log", b"line1\n");
    let client = client_with(&mock);
    mock.clear_calls();

    let mut fh = client.open("/log", OpenMode::Append).unwrap();
    assert_eq!(mock.calls(), vec!["UG_create", "UG_open", "UG_seek"]);
    fh.write(b"line2\n").unwrap();
    fh.close().unwrap();
    assert_eq!(mock.contents("/log").unwrap(), b"line1\nline2\n");
}

#[test]
fn test_open_append_seek_failure_closes_handle() {
    let mock = MockUg::new().with_file("/log", b"x");
    let client = client_with(&mock);
    mock.fail_next("UG_seek", libc::EIO);

    let err = client.open("/log", OpenMode::Append).unwrap_err();
    assert_eq!(err.errno(), Some(libc::EIO));
    assert_eq!(mock.live_handles(), 0);
}

// === read / write loops ===

/// Short native reads are accumulated until EOF
#[test]
fn test_read_loop_stops_at_eof() {
    let mock = MockUg::new().with_file("/f", b"0123456789");
    let client = client_with(&mock);
    mock.set_read_chunk(Some(3));

    let mut fh = client.open("/f", OpenMode::Read).unwrap();
    mock.clear_calls();
    let data = fh.read(64).unwrap();

    assert_eq!(data, b"0123456789");
    // 3 + 3 + 3 + 1, then the zero-length read
    assert_eq!(mock.count("UG_read"), 5);
}

#[test]
fn test_read_exact_size_needs_no_eof_probe() {
    let mock = MockUg::new().with_file("/f", b"abcdef");
    let client = client_with(&mock);
    let mut fh = client.open("/f", OpenMode::Read).unwrap();
    mock.clear_calls();

    assert_eq!(fh.read(4).unwrap(), b"abcd");
    assert_eq!(mock.count("UG_read"), 1);
    assert_eq!(fh.read(4).unwrap(), b"ef");
    assert_eq!(fh.read(4).unwrap(), b"");
}

#[test]
fn test_read_error_propagates() {
    let mock = MockUg::new().with_file("/f", b"abc");
    let client = client_with(&mock);
    let mut fh = client.open("/f", OpenMode::Read).unwrap();
    mock.fail_next("UG_read", libc::EIO);

    let err = fh.read(3).unwrap_err();
    assert_eq!(err.errno(), Some(libc::EIO));
}

#[test]
fn test_read_to_end_in_chunks() {
    let body: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let mock = MockUg::new().with_file("/big", &body);
    let client = client_with(&mock);

    let mut fh = client.open("/big", OpenMode::Read).unwrap();
    assert_eq!(fh.read_to_end(128).unwrap(), body);
}

/// Partial native writes advance through the caller's buffer
#[test]
fn test_write_loop_submits_remaining_bytes() {
    let mock = MockUg::new();
    let client = client_with(&mock);
    mock.set_write_chunk(Some(4));

    let mut fh = client.open("/out", OpenMode::Write).unwrap();
    mock.clear_calls();
    assert_eq!(fh.write(b"hello world").unwrap(), 11);
    assert_eq!(mock.count("UG_write"), 3);
    fh.close().unwrap();
    assert_eq!(mock.contents("/out").unwrap(), b"hello world");
}

#[test]
fn test_zero_byte_write_is_eio() {
    let mock = MockUg::new();
    let client = client_with(&mock);
    mock.set_write_chunk(Some(0));

    let mut fh = client.open("/out", OpenMode::Write).unwrap();
    let err = fh.write(b"x").unwrap_err();
    assert_eq!(err.errno(), Some(libc::EIO));
}

#[test]
fn test_seek_fsync_truncate() {
    let mock = MockUg::new().with_file("/f", b"abcdef");
    let client = client_with(&mock);

    let mut fh = client.open("/f", OpenMode::Read).unwrap();
    assert_eq!(fh.seek(4).unwrap(), 4);
    assert_eq!(fh.read(10).unwrap(), b"ef");
    fh.fsync().unwrap();
    fh.truncate(2).unwrap();
    assert_eq!(mock.contents("/f").unwrap(), b"ab");
    fh.close().unwrap();
    assert_eq!(mock.count("UG_close"), 1);
}

// === directories ===

/// Every batch is freed, the terminal empty one too, and closedir runs once
#[test]
fn test_list_dir_frees_batches_and_closes_once() {
    let mock = MockUg::new()
        .with_dir("/d")
        .with_file("/d/a", b"1")
        .with_file("/d/b", b"22")
        .with_dir("/d/sub");
    let client = client_with(&mock);
    mock.clear_calls();

    let entries = client.list_dir("/d").unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "sub"]);
    assert!(entries[0].is_file());
    assert_eq!(entries[1].size, 2);
    assert!(entries[2].is_dir());

    // batch size 1: three entry batches plus the empty terminator
    assert_eq!(mock.count("UG_readdir"), 4);
    assert_eq!(mock.count("UG_free_dir_listing"), 4);
    assert_eq!(mock.live_batches(), 0);
    assert_eq!(mock.count("UG_closedir"), 1);
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_list_dir_larger_batches() {
    let mock = MockUg::new()
        .with_dir("/d")
        .with_file("/d/a", b"")
        .with_file("/d/b", b"")
        .with_file("/d/c", b"");
    let client = client_with(&mock).with_readdir_batch(2);
    mock.clear_calls();

    assert_eq!(client.list_dir("/d").unwrap().len(), 3);
    assert_eq!(mock.count("UG_readdir"), 3);
    assert_eq!(mock.live_batches(), 0);
}

#[test]
fn test_list_empty_dir() {
    let mock = MockUg::new().with_dir("/empty");
    let client = client_with(&mock);

    assert!(client.list_dir("/empty").unwrap().is_empty());
    // an empty batch ends the listing without another read
    assert_eq!(mock.count("UG_readdir"), 1);
    assert_eq!(mock.count("UG_free_dir_listing"), 1);
    assert_eq!(mock.count("UG_closedir"), 1);
}

/// A successful readdir with no listing ends the walk; nothing to free
#[test]
fn test_list_dir_null_listing_keeps_entries_so_far() {
    let mock = MockUg::new()
        .with_dir("/d")
        .with_file("/d/a", b"")
        .with_file("/d/b", b"")
        .with_file("/d/c", b"");
    let client = client_with(&mock);
    mock.set_null_listing_after(Some(1));
    mock.clear_calls();

    let entries = client.list_dir("/d").unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a"]);
    assert_eq!(
        mock.calls(),
        vec!["UG_opendir", "UG_readdir", "UG_free_dir_listing", "UG_readdir", "UG_closedir"]
    );
    assert_eq!(mock.live_batches(), 0);
    assert_eq!(mock.live_handles(), 0);
}

/// A readdir failure still closes the handle, then surfaces
#[test]
fn test_list_dir_read_failure_closes_then_reports() {
    let mock = MockUg::new().with_dir("/d").with_file("/d/a", b"");
    let client = client_with(&mock);
    mock.fail_next("UG_readdir", libc::EIO);
    mock.clear_calls();

    let err = client.list_dir("/d").unwrap_err();
    assert_eq!(err.errno(), Some(libc::EIO));
    assert_eq!(mock.calls(), vec!["UG_opendir", "UG_readdir", "UG_closedir"]);
    assert_eq!(mock.live_handles(), 0);
}

#[test]
fn test_list_dir_on_missing_path() {
    let mock = MockUg::new();
    let client = client_with(&mock);
    let err = client.list_dir("/missing").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(mock.count("UG_closedir"), 0);
}

#[test]
fn test_read_dir_dropped_early_still_closes() {
    let mock = MockUg::new()
        .with_dir("/d")
        .with_file("/d/a", b"")
        .with_file("/d/b", b"");
    let client = client_with(&mock);

    let mut dir = client.read_dir("/d").unwrap();
    assert_eq!(dir.next().unwrap().unwrap().name, "a");
    drop(dir);

    assert_eq!(mock.count("UG_closedir"), 1);
    assert_eq!(mock.live_batches(), 0);
    assert_eq!(mock.live_handles(), 0);
}

// === metadata ===

#[test]
fn test_stat_raw_frees_entry_strings() {
    let mock = MockUg::new()
        .with_file("/f", b"hello")
        .with_xattr("/f", "user.k", b"v");
    let client = client_with(&mock);

    let entry = client.stat_raw("/f").unwrap();
    assert_eq!(entry.name, "f");
    assert_eq!(entry.size, 5);
    assert_eq!(entry.ent_sig, b"sig:f");
    assert!(entry.xattr_hash.is_some());
    assert_eq!(mock.entries_freed(), 1);

    let json = entry.to_json().unwrap();
    assert!(json.contains(&format!("\"ent_sig\":\"{}\"", hex::encode(b"sig:f"))));
}

#[test]
fn test_stat_and_statvfs() {
    let mock = MockUg::new().with_file("/f", b"12345").with_dir("/d");
    let client = client_with(&mock);

    let st = client.stat("/f").unwrap();
    assert!(st.is_file());
    assert_eq!(st.size, 5);
    assert!(client.stat("/d").unwrap().is_dir());
    assert!(client.stat("/x").unwrap_err().is_not_found());

    let vfs = client.statvfs().unwrap();
    assert_eq!(vfs.bsize, 4096);
    assert_eq!(vfs.namemax, 255);
}

#[test]
fn test_namespace_operations() {
    let mock = MockUg::new().with_file("/f", b"abc");
    let client = client_with(&mock);

    client.mkdir("/d", Some(0o700)).unwrap();
    assert_eq!(mock.mode_of("/d"), Some(0o700));
    assert_eq!(client.mkdir("/d", None).unwrap_err().errno(), Some(libc::EEXIST));

    client.rename("/f", "/d/g").unwrap();
    assert!(!mock.exists("/f"));
    assert_eq!(client.rmdir("/d").unwrap_err().errno(), Some(libc::ENOTEMPTY));

    client.chmod("/d/g", 0o600).unwrap();
    client.chown("/d/g", 42).unwrap();
    client.utime("/d/g", 100, 200).unwrap();
    client.truncate("/d/g", 1).unwrap();
    client.access("/d/g", libc::R_OK).unwrap();
    client.invalidate("/d/g").unwrap();
    client.refresh("/d/g").unwrap();
    assert_eq!(mock.mode_of("/d/g"), Some(0o600));
    assert_eq!(mock.owner_of("/d/g"), Some(42));
    assert_eq!(mock.times_of("/d/g"), Some((100, 200)));
    assert_eq!(mock.contents("/d/g").unwrap(), b"a");

    client.unlink("/d/g").unwrap();
    client.rmdir("/d").unwrap();
    assert!(!mock.exists("/d"));
}

#[test]
fn test_mkdir_default_mode_uses_umask() {
    let mock = MockUg::new();
    let client = client_with(&mock);
    client.mkdir("/d", None).unwrap();
    assert_eq!(mock.mode_of("/d"), Some(syndicate_ug::default_dir_mode()));
}

#[test]
fn test_vacuum_waits() {
    let mock = MockUg::new().with_file("/f", b"");
    let client = client_with(&mock);
    client.vacuum("/f").unwrap();
    assert_eq!(mock.count("UG_vacuum_wait"), 1);
    assert_eq!(mock.live_vacuums(), 0);
    assert!(client.vacuum("/nope").unwrap_err().is_not_found());
}

// === xattrs ===

/// Positive size probe: exactly two native calls
#[test]
fn test_get_xattr_probes_then_reads() {
    let mock = MockUg::new().with_file("/f", b"").with_xattr("/f", "user.color", b"blue");
    let client = client_with(&mock);
    mock.clear_calls();

    assert_eq!(client.get_xattr("/f", "user.color").unwrap(), b"blue");
    assert_eq!(mock.count("UG_getxattr"), 2);
}

/// Zero size probe: one native call, empty result
#[test]
fn test_get_xattr_empty_value_single_call() {
    let mock = MockUg::new().with_file("/f", b"").with_xattr("/f", "user.empty", b"");
    let client = client_with(&mock);
    mock.clear_calls();

    assert!(client.get_xattr("/f", "user.empty").unwrap().is_empty());
    assert_eq!(mock.count("UG_getxattr"), 1);
}

#[test]
fn test_list_xattr_call_counts() {
    let mock = MockUg::new()
        .with_file("/f", b"")
        .with_file("/bare", b"")
        .with_xattr("/f", "user.a", b"1")
        .with_xattr("/f", "user.b", b"2");
    let client = client_with(&mock);
    mock.clear_calls();

    assert_eq!(client.list_xattr("/f").unwrap(), vec!["user.a", "user.b"]);
    assert_eq!(mock.count("UG_listxattr"), 2);

    mock.clear_calls();
    assert!(client.list_xattr("/bare").unwrap().is_empty());
    assert_eq!(mock.count("UG_listxattr"), 1);
}

#[test]
fn test_set_and_remove_xattr() {
    let mock = MockUg::new().with_file("/f", b"");
    let client = client_with(&mock);

    client.set_xattr("/f", "user.k", b"v1", XattrFlags::Create).unwrap();
    let err = client.set_xattr("/f", "user.k", b"v2", XattrFlags::Create).unwrap_err();
    assert_eq!(err.errno(), Some(libc::EEXIST));
    client.set_xattr("/f", "user.k", b"v2", XattrFlags::Replace).unwrap();
    assert_eq!(mock.xattr("/f", "user.k").unwrap(), b"v2");

    client.remove_xattr("/f", "user.k").unwrap();
    assert_eq!(client.get_xattr("/f", "user.k").unwrap_err().errno(), Some(libc::ENODATA));
}
