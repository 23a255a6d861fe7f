pub mod fake_aws;
