use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use vecjit_lib::{CompileRequest, Jit, JitError, module_name};

use super::common::{TestEnv, fixture_path, mtimes, tools_available};

fn shared_object_dir(env: &TestEnv) -> PathBuf {
  let dirs: Vec<_> = fs::read_dir(env.build_root().join("shared/bin"))
    .unwrap()
    .map(|e| e.unwrap().path())
    .collect();
  assert_eq!(dirs.len(), 1, "expected one toolchain directory, found {dirs:?}");
  dirs.into_iter().next().unwrap()
}

#[test]
fn compile_dimension_128() {
  if !tools_available() {
    return;
  }
  let env = TestEnv::new();

  let module = env.jit().compile(&CompileRequest::new(128).quiet(true)).unwrap();

  assert_eq!(module.name, module_name(128));
  assert_eq!(module.name, "vecdbImpl128");
  assert!(module.path.is_file());
  assert!(module.path.starts_with(fs::canonicalize(env.build_root()).unwrap()));

  let sources: BTreeSet<PathBuf> = module.compile_commands.iter().map(|c| c.source_path()).collect();
  let expected: BTreeSet<PathBuf> = ["vecdbImpl", "searchAlgorithm", "diskIO", "encoding"]
    .iter()
    .map(|name| fixture_path(&format!("src/{}.cpp", name)))
    .collect();
  assert_eq!(sources, expected);

  let dependent = module
    .compile_commands
    .iter()
    .find(|c| c.file.ends_with("vecdbImpl.cpp"))
    .unwrap();
  assert!(dependent.command.contains("-DFEAT_DIM=128"));
  assert!(dependent.command.contains("-DMODULE_NAME=vecdbImpl128"));
  assert!(module.compdb_path.unwrap().is_file());
}

#[test]
fn second_dimension_reuses_shared_objects() {
  if !tools_available() {
    return;
  }
  let env = TestEnv::new();
  let jit = env.jit();

  let first = jit.compile(&CompileRequest::new(128).quiet(true)).unwrap();
  let shared = shared_object_dir(&env);
  let before = mtimes(&shared);
  assert_eq!(before.len(), 3);

  let second = jit.compile(&CompileRequest::new(256).quiet(true)).unwrap();
  let after = mtimes(&shared);

  assert_eq!(before, after, "shared objects were rebuilt");
  assert_ne!(first.path, second.path);
  assert_ne!(first.path.parent(), second.path.parent());
  assert!(first.path.is_file() && second.path.is_file());
  assert!(env.build_root().join("vecdbImpl128/bin/vecdbImpl.o").is_file());
  assert!(env.build_root().join("vecdbImpl256/bin/vecdbImpl.o").is_file());
  assert_eq!(env.fetcher.calls(), 1);
}

#[test]
fn repeated_request_is_stable_and_incremental() {
  if !tools_available() {
    return;
  }
  let env = TestEnv::new();
  let jit = env.jit();
  let request = CompileRequest::new(64).quiet(true);

  let first = jit.compile(&request).unwrap();
  let build_file = env.build_root().join("vecdbImpl64/scripts/build.ninja");
  let description = fs::read_to_string(&build_file).unwrap();
  let private = mtimes(&env.build_root().join("vecdbImpl64/bin"));
  let shared = mtimes(&shared_object_dir(&env));

  let second = jit.compile(&request).unwrap();

  assert_eq!(first.path, second.path);
  assert_eq!(fs::read_to_string(&build_file).unwrap(), description);
  assert_eq!(mtimes(&env.build_root().join("vecdbImpl64/bin")), private);
  assert_eq!(mtimes(&shared_object_dir(&env)), shared);
}

#[test]
fn extra_compile_flags_get_their_own_shared_objects() {
  if !tools_available() {
    return;
  }
  let env = TestEnv::new();
  let jit = env.jit();

  jit.compile(&CompileRequest::new(32).quiet(true)).unwrap();
  jit.compile(&CompileRequest::new(32).quiet(true).compile_flag("-O3")).unwrap();

  let toolchains = fs::read_dir(env.build_root().join("shared/bin")).unwrap().count();
  assert_eq!(toolchains, 2);
}

#[test]
fn compiler_errors_are_reported_verbatim() {
  if !tools_available() {
    return;
  }
  let env = TestEnv::new();
  let src = env.copy_sources();
  fs::write(src.join("vecdbImpl.cpp"), "int broken( {\n").unwrap();
  let jit = Jit::with_fetcher(env.config_with_sources(&src), env.fetcher.clone());

  let err = jit.compile(&CompileRequest::new(16).quiet(true)).unwrap_err();

  match err {
    JitError::BuildFailed { stderr, .. } => {
      assert!(stderr.contains("vecdbImpl.cpp"), "diagnostics missing: {stderr}");
      assert!(stderr.contains("error"), "diagnostics missing: {stderr}");
    }
    other => panic!("expected BuildFailed, got {other:?}"),
  }
  assert!(!env.build_root().join("vecdbImpl16/bin/vecdbImpl16.so").exists());
}

#[test]
fn streamed_build_errors_are_reported_verbatim() {
  if !tools_available() {
    return;
  }
  let env = TestEnv::new();
  let src = env.copy_sources();
  fs::write(src.join("searchAlgorithm.cpp"), "int broken( {\n").unwrap();
  let jit = Jit::with_fetcher(env.config_with_sources(&src), env.fetcher.clone());

  let err = jit.compile(&CompileRequest::new(24)).unwrap_err();

  match err {
    JitError::BuildFailed { stderr, .. } => {
      assert!(stderr.contains("searchAlgorithm.cpp"), "diagnostics missing: {stderr}");
      assert!(stderr.contains("error"), "diagnostics missing: {stderr}");
    }
    other => panic!("expected BuildFailed, got {other:?}"),
  }
}

#[test]
fn concurrent_dimensions_share_one_build_root() {
  if !tools_available() {
    return;
  }
  let env = TestEnv::new();
  let jit = env.jit();

  let modules: Vec<_> = std::thread::scope(|scope| {
    let handles: Vec<_> = [128, 256, 512]
      .into_iter()
      .map(|dim| {
        let jit = &jit;
        scope.spawn(move || jit.compile(&CompileRequest::new(dim).quiet(true)))
      })
      .collect();
    handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect()
  });

  for (module, dim) in modules.iter().zip([128, 256, 512]) {
    assert_eq!(module.name, module_name(dim));
    assert!(module.path.is_file());
  }
  let dirs: BTreeSet<_> = modules.iter().map(|m| m.path.parent().unwrap().to_path_buf()).collect();
  assert_eq!(dirs.len(), 3);

  assert_eq!(mtimes(&shared_object_dir(&env)).len(), 3);
  assert_eq!(env.fetcher.calls(), 1);
}
