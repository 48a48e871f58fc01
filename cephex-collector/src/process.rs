//! Process accounting for daemons that publish a pid file.
//!
//! Reads `<proc>/<pid>/stat` and `<proc>/uptime` and turns them into the
//! `ceph_exporter_*` process metrics.

use std::fs;
use std::path::Path;

use cephex_core::{DaemonName, LabelSet};
use cephex_metrics::{MetricKind, MetricsBuilder, SampleValue};

use crate::error::{io_err, CollectError, ParseError};

/// Clock ticks per second used by `/proc/<pid>/stat` time fields.
pub const CLK_TCK: u64 = 100;

/// Fields of `/proc/<pid>/stat` counted from the first one after `(comm)`.
const STAT_MINFLT: usize = 7;
const STAT_MAJFLT: usize = 9;
const STAT_UTIME: usize = 11;
const STAT_STIME: usize = 12;
const STAT_NUM_THREADS: usize = 17;
const STAT_STARTTIME: usize = 19;
const STAT_VSIZE: usize = 20;
const STAT_RSS: usize = 21;

/// The subset of `/proc/<pid>/stat` the exporter reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcStat {
    pub minflt: u64,
    pub majflt: u64,
    /// Ticks in user mode.
    pub utime: u64,
    /// Ticks in kernel mode.
    pub stime: u64,
    pub num_threads: u64,
    /// Ticks after boot at which the process started.
    pub starttime: u64,
    /// Virtual memory size in bytes.
    pub vsize: u64,
    /// Resident set size in pages.
    pub rss: i64,
}

/// Parses `/proc/<pid>/stat` content.
///
/// The command name may contain spaces and parentheses, so fields are
/// counted from the last `)`.
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;
    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();
    if fields.len() <= STAT_RSS {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected {}+, got {}",
            STAT_RSS + 1,
            fields.len()
        )));
    }

    let field = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {name}")))
    };

    Ok(ProcStat {
        minflt: field(STAT_MINFLT, "minflt")?,
        majflt: field(STAT_MAJFLT, "majflt")?,
        utime: field(STAT_UTIME, "utime")?,
        stime: field(STAT_STIME, "stime")?,
        num_threads: field(STAT_NUM_THREADS, "num_threads")?,
        starttime: field(STAT_STARTTIME, "starttime")?,
        vsize: field(STAT_VSIZE, "vsize")?,
        rss: fields[STAT_RSS]
            .parse()
            .map_err(|_| ParseError::new("invalid rss"))?,
    })
}

/// Seconds since boot, the first field of `/proc/uptime`.
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new("empty uptime"))?
        .parse()
        .map_err(|_| ParseError::new("invalid uptime"))
}

/// Parses a pid file: one positive integer, surrounding whitespace allowed.
pub fn parse_pid(content: &str) -> Result<u32, ParseError> {
    match content.trim().parse::<u32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(ParseError::new(format!("invalid pid '{}'", content.trim()))),
    }
}

pub fn read_pid_file(path: &Path) -> Result<u32, CollectError> {
    let content = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse_pid(&content).map_err(|source| CollectError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// One reading of a process's accounting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSample {
    pub stat: ProcStat,
    pub uptime_secs: f64,
}

impl ProcessSample {
    /// Read `<proc_path>/<pid>/stat` and `<proc_path>/uptime`.
    pub fn read(proc_path: &Path, pid: u32) -> Result<Self, CollectError> {
        let stat_path = proc_path.join(pid.to_string()).join("stat");
        let uptime_path = proc_path.join("uptime");
        Ok(Self {
            stat: parse_proc_stat(&read(&stat_path)?).map_err(|source| CollectError::Parse {
                path: stat_path.clone(),
                source,
            })?,
            uptime_secs: parse_uptime(&read(&uptime_path)?).map_err(|source| {
                CollectError::Parse {
                    path: uptime_path.clone(),
                    source,
                }
            })?,
        })
    }

    pub fn cpu(&self) -> CpuTimes {
        let ticks = CLK_TCK as f64;
        let user_secs = self.stat.utime as f64 / ticks;
        let kernel_secs = self.stat.stime as f64 / ticks;
        let start_secs = self.stat.starttime as f64 / ticks;
        CpuTimes {
            user_secs,
            kernel_secs,
            elapsed_secs: self.uptime_secs - start_secs,
        }
    }
}

fn read(path: &Path) -> Result<String, CollectError> {
    fs::read_to_string(path).map_err(|e| io_err(path, e))
}

/// CPU time split of a process over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpuTimes {
    pub user_secs: f64,
    pub kernel_secs: f64,
    /// Wall-clock seconds since the process started.
    pub elapsed_secs: f64,
}

impl CpuTimes {
    pub fn total_secs(&self) -> f64 {
        self.user_secs + self.kernel_secs
    }

    /// `None` when no wall-clock time has elapsed yet.
    pub fn idle_secs(&self) -> Option<f64> {
        (self.elapsed_secs > 0.0).then(|| self.elapsed_secs - self.total_secs())
    }

    /// Lifetime CPU usage in percent; `None` when no time has elapsed.
    pub fn usage_percent(&self) -> Option<f64> {
        (self.elapsed_secs > 0.0).then(|| self.total_secs() * 100.0 / self.elapsed_secs)
    }
}

const CPU_TIME_HELP: &str = "Process time in kernel/user/idle mode";

/// Add the process metrics of `daemon` to `builder`.
pub fn add_process_metrics(builder: &mut MetricsBuilder, daemon: &DaemonName, sample: &ProcessSample) {
    let labels = LabelSet::new().with("ceph_daemon", daemon.as_str());
    let stat = &sample.stat;
    let cpu = sample.cpu();

    builder.add(
        stat.minflt,
        "ceph_exporter_minflt_total",
        "Number of minor page faults of daemon",
        MetricKind::Counter,
        labels.clone(),
    );
    builder.add(
        stat.majflt,
        "ceph_exporter_majflt_total",
        "Number of major page faults of daemon",
        MetricKind::Counter,
        labels.clone(),
    );
    builder.add(
        stat.num_threads,
        "ceph_exporter_num_threads",
        "Number of threads used by daemon",
        MetricKind::Gauge,
        labels.clone(),
    );
    if let Some(usage) = cpu.usage_percent() {
        builder.add(
            usage,
            "ceph_exporter_cpu_usage",
            "CPU usage of a daemon",
            MetricKind::Gauge,
            labels.clone(),
        );
    } else {
        tracing::debug!(daemon = %daemon, "no elapsed time since process start, skipping cpu usage");
    }

    let mut modes = vec![("kernel", cpu.kernel_secs), ("user", cpu.user_secs)];
    if let Some(idle) = cpu.idle_secs() {
        modes.push(("idle", idle));
    }
    for (mode, secs) in modes {
        builder.add(
            secs,
            "ceph_exporter_cpu_total",
            CPU_TIME_HELP,
            MetricKind::Counter,
            labels.clone().with("mode", mode),
        );
    }

    builder.add(
        stat.vsize,
        "ceph_exporter_vm_size",
        "Virtual memory used in a daemon",
        MetricKind::Gauge,
        labels.clone(),
    );
    builder.add(
        SampleValue::Int(stat.rss),
        "ceph_exporter_resident_size",
        "Resident memory in a daemon",
        MetricKind::Gauge,
        labels,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A `stat` line whose command name contains spaces and parentheses.
    const STAT: &str = "4242 (ceph-osd (x) 1) S 1 4242 4242 0 -1 4194560 1500 0 12 0 \
                        250 50 0 0 20 0 64 0 1000 1048576 300 18446744073709551615 \
                        1 1 0 0 0 0 0 4096 0 0 0 0 17 3 0 0 0 0 0\n";

    #[test]
    fn stat_fields_are_counted_after_last_paren() {
        let stat = parse_proc_stat(STAT).expect("parse");
        assert_eq!(
            stat,
            ProcStat {
                minflt: 1500,
                majflt: 12,
                utime: 250,
                stime: 50,
                num_threads: 64,
                starttime: 1000,
                vsize: 1048576,
                rss: 300,
            }
        );
    }

    #[test]
    fn short_stat_is_rejected() {
        let err = parse_proc_stat("1 (init) S 0 1").unwrap_err();
        assert!(err.0.contains("not enough fields"), "got: {err}");
        assert!(parse_proc_stat("no parens here").is_err());
    }

    #[test]
    fn uptime_and_pid_parse() {
        assert_eq!(parse_uptime("12345.67 98765.43\n"), Ok(12345.67));
        assert!(parse_uptime("").is_err());
        assert_eq!(parse_pid(" 4242\n"), Ok(4242));
        assert!(parse_pid("0").is_err());
        assert!(parse_pid("abc").is_err());
    }

    #[test]
    fn cpu_times_from_ticks() {
        let sample = ProcessSample {
            stat: parse_proc_stat(STAT).expect("parse"),
            uptime_secs: 40.0,
        };
        let cpu = sample.cpu();
        assert_eq!(cpu.user_secs, 2.5);
        assert_eq!(cpu.kernel_secs, 0.5);
        assert_eq!(cpu.elapsed_secs, 30.0);
        assert_eq!(cpu.idle_secs(), Some(27.0));
        assert_eq!(cpu.usage_percent(), Some(10.0));
    }

    #[test]
    fn zero_elapsed_omits_usage_and_idle() {
        let sample = ProcessSample {
            stat: parse_proc_stat(STAT).expect("parse"),
            uptime_secs: 10.0,
        };
        assert_eq!(sample.cpu().usage_percent(), None);

        let mut builder = MetricsBuilder::new(true);
        add_process_metrics(&mut builder, &DaemonName::from("osd.0"), &sample);
        let text = builder.dump();
        assert!(!text.contains("ceph_exporter_cpu_usage"));
        assert!(!text.contains("mode=\"idle\""));
        assert!(text.contains("ceph_exporter_cpu_total{ceph_daemon=\"osd.0\",mode=\"user\"} 2.5"));
    }

    #[test]
    fn process_metrics_are_labelled_by_daemon() {
        let sample = ProcessSample {
            stat: parse_proc_stat(STAT).expect("parse"),
            uptime_secs: 40.0,
        };
        let mut builder = MetricsBuilder::new(true);
        add_process_metrics(&mut builder, &DaemonName::from("ceph-osd.0"), &sample);
        let text = builder.dump();
        for line in [
            "ceph_exporter_minflt_total{ceph_daemon=\"ceph-osd.0\"} 1500",
            "ceph_exporter_majflt_total{ceph_daemon=\"ceph-osd.0\"} 12",
            "ceph_exporter_num_threads{ceph_daemon=\"ceph-osd.0\"} 64",
            "ceph_exporter_cpu_usage{ceph_daemon=\"ceph-osd.0\"} 10",
            "ceph_exporter_cpu_total{ceph_daemon=\"ceph-osd.0\",mode=\"idle\"} 27",
            "ceph_exporter_vm_size{ceph_daemon=\"ceph-osd.0\"} 1048576",
            "ceph_exporter_resident_size{ceph_daemon=\"ceph-osd.0\"} 300",
        ] {
            assert!(text.contains(line), "missing {line} in:\n{text}");
        }
    }

    #[test]
    fn read_from_fake_proc_tree() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("4242")).expect("pid dir");
        fs::write(dir.path().join("4242/stat"), STAT).expect("stat");
        fs::write(dir.path().join("uptime"), "40.00 80.00\n").expect("uptime");
        let sample = ProcessSample::read(dir.path(), 4242).expect("sample");
        assert_eq!(sample.stat.num_threads, 64);
        assert_eq!(sample.uptime_secs, 40.0);

        let err = ProcessSample::read(dir.path(), 1).unwrap_err();
        assert!(matches!(err, CollectError::Io { .. }), "got: {err}");
    }
}
