use vecjit_lib::CompileRequest;
use vecjit_lib::deps::{DependencyCache, DependencyState};

use super::common::{TestEnv, tools_available};

#[test]
fn dependency_is_fetched_once_across_requests() {
  if !tools_available() {
    return;
  }
  let env = TestEnv::new();
  let jit = env.jit();

  let prepared = jit.prepare(&CompileRequest::new(8)).unwrap();
  jit.prepare(&CompileRequest::new(9)).unwrap();

  assert_eq!(env.fetcher.calls(), 1);
  assert_eq!(prepared.dependency.local_path, env.cache_root().join("eigen-3.4.0"));
  assert!(prepared.dependency.local_path.join("Eigen/Core").is_file());

  let cache = DependencyCache::new(env.cache_root(), env.fetcher.clone());
  assert_eq!(cache.state(&jit.config().dependency), DependencyState::Present);
}
