//! Build, install and run both executables with default arguments.

use kdtest_common::{
    BuildArgs, ProcessRunner, Role, StepRequest, TestGroup, TestOptions, TestPaths,
};

pub const TITLE: &str = "Basic build/install/run test:";
const DESCRIPTION: &str = "Basic build/install/run test";

pub fn basic_build<R: ProcessRunner + 'static>(
    options: &TestOptions,
    paths: &TestPaths,
    runner: R,
) -> TestGroup<R> {
    TestGroup::new(
        TITLE,
        |group: &mut TestGroup<R>| {
            let args = BuildArgs::new(group.paths())
                .with_options(group.options())
                .to_args();
            let request = StepRequest::new(args, group.paths().secure_exe_path(Role::Parent));
            let result = group.full_test(&request);
            group.check_result(&result, DESCRIPTION)?;
            Ok(())
        },
        1,
        options.clone(),
        paths.clone(),
        runner,
    )
}
