use log::warn;

/// Worker threads to use: the requested count, or every available core
pub fn determine_thread_count(total: Option<usize>) -> anyhow::Result<usize> {
    if let Some(total) = total {
        if total < 1 {
            anyhow::bail!("Cannot run with zero threads")
        }
        return anyhow::Ok(total);
    }
    match std::thread::available_parallelism() {
        Ok(total) => anyhow::Ok(total.get()),
        Err(_) => {
            warn!("Could not autodetect the number of threads available. Setting to 1, but it is better if you specify");
            anyhow::Ok(1)
        }
    }
}

/// Never more workers than there are jobs
pub fn threads_for_jobs(threads: usize, jobs: usize) -> usize {
    threads.min(jobs).max(1)
}
