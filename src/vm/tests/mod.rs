// All the tests with prefix 'mock_test_' use MockVM. The mock VM and the mock runtime behind
// it are process-wide, so `with_mockvm` runs those tests one at a time. Each test creates its
// own heap through the fixtures in `crate::util::test_util::fixtures`.

mod mock_tests;
