mod test_jobs_basic;
mod test_merge_basic;
mod test_receive_basic;
