//! Translating a process/thread request into a node layout.
//!
//! One pure function shared by every backend; the backends differ only in
//! how they spell the layout in their directives.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SchedError, SchedResult};

/// Processes and threads requested for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// MPI processes.
    pub process_count: u32,

    /// OpenMP threads per process.
    pub threads_per_process: u32,
}

impl ResourceRequest {
    /// Create a request; both counts must be at least 1.
    pub fn new(process_count: u32, threads_per_process: u32) -> SchedResult<Self> {
        if process_count == 0 || threads_per_process == 0 {
            return Err(SchedError::InvalidResourceRequest(format!(
                "need at least one process and one thread, got {process_count} x {threads_per_process}"
            )));
        }
        Ok(Self {
            process_count,
            threads_per_process,
        })
    }

    /// Total cores the run occupies.
    pub fn total_cores(&self) -> u64 {
        u64::from(self.process_count) * u64::from(self.threads_per_process)
    }
}

/// Node/task assignment for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Nodes allocated.
    pub node_count: u32,

    /// Processes placed on each full node.
    pub processes_per_node: u32,

    /// Processes on the node that takes the remainder.
    pub first_node_task_count: u32,
}

impl Layout {
    /// Total processes placed by the layout.
    pub fn total_tasks(&self) -> u64 {
        u64::from(self.processes_per_node) * u64::from(self.node_count - 1)
            + u64::from(self.first_node_task_count)
    }
}

/// Non-fatal observations about a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutWarning {
    /// Threads per process do not divide the node, so some cores stay idle.
    Underutilized {
        cores_per_node: u32,
        threads_per_process: u32,
        idle_cores_per_node: u32,
    },
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutWarning::Underutilized {
                cores_per_node,
                threads_per_process,
                idle_cores_per_node,
            } => write!(
                f,
                "{threads_per_process} threads per process do not divide {cores_per_node} cores per node; \
                 {idle_cores_per_node} core(s) per node will be idle"
            ),
        }
    }
}

/// A layout together with any warnings raised while computing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub layout: Layout,
    pub warning: Option<LayoutWarning>,
}

/// Compute the node layout for `request` on nodes of `cores_per_node` cores.
///
/// Requests that fit strictly inside one node are packed on it. Otherwise
/// every full node carries `cores_per_node / threads_per_process` processes
/// and the remaining node takes what is left.
pub fn partition(request: &ResourceRequest, cores_per_node: u32) -> SchedResult<Partition> {
    if cores_per_node == 0 {
        return Err(SchedError::ConfigError(
            "cores_per_node must be at least 1".to_string(),
        ));
    }
    let ResourceRequest {
        process_count,
        threads_per_process,
    } = *request;
    if threads_per_process > cores_per_node {
        return Err(SchedError::InvalidResourceRequest(format!(
            "cannot use more threads ({threads_per_process} asked) than the number of cores ({cores_per_node})"
        )));
    }

    let idle = cores_per_node % threads_per_process;
    let warning = (idle != 0).then_some(LayoutWarning::Underutilized {
        cores_per_node,
        threads_per_process,
        idle_cores_per_node: idle,
    });

    let layout = if request.total_cores() < u64::from(cores_per_node) {
        Layout {
            node_count: 1,
            processes_per_node: process_count,
            first_node_task_count: process_count,
        }
    } else {
        let processes_per_node = cores_per_node / threads_per_process;
        // Equal to ceil(total_cores / cores_per_node) whenever the threads
        // divide the node; otherwise this also covers the idle cores.
        let node_count = process_count.div_ceil(processes_per_node);
        Layout {
            node_count,
            processes_per_node,
            first_node_task_count: process_count - (node_count - 1) * processes_per_node,
        }
    };

    Ok(Partition { layout, warning })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn layout(p: u32, t: u32, c: u32) -> Layout {
        partition(&ResourceRequest::new(p, t).unwrap(), c)
            .unwrap()
            .layout
    }

    #[test]
    fn test_multi_node_example() {
        assert_eq!(
            layout(10, 4, 8),
            Layout {
                node_count: 5,
                processes_per_node: 2,
                first_node_task_count: 2,
            }
        );
    }

    #[test]
    fn test_single_node_example() {
        assert_eq!(
            layout(3, 2, 16),
            Layout {
                node_count: 1,
                processes_per_node: 3,
                first_node_task_count: 3,
            }
        );
    }

    #[test]
    fn test_exactly_one_full_node() {
        assert_eq!(
            layout(2, 4, 8),
            Layout {
                node_count: 1,
                processes_per_node: 2,
                first_node_task_count: 2,
            }
        );
    }

    #[test]
    fn test_uneven_remainder() {
        // 7 single-threaded processes on 4-core nodes: 4 + 3.
        assert_eq!(
            layout(7, 1, 4),
            Layout {
                node_count: 2,
                processes_per_node: 4,
                first_node_task_count: 3,
            }
        );
    }

    #[test]
    fn test_too_many_threads() {
        let request = ResourceRequest::new(4, 16).unwrap();
        assert!(matches!(
            partition(&request, 8),
            Err(SchedError::InvalidResourceRequest(_))
        ));
    }

    #[test]
    fn test_zero_counts_rejected() {
        assert!(ResourceRequest::new(0, 1).is_err());
        assert!(ResourceRequest::new(1, 0).is_err());
    }

    #[test]
    fn test_underutilization_warning() {
        let request = ResourceRequest::new(5, 3).unwrap();
        let result = partition(&request, 8).unwrap();
        assert_eq!(
            result.warning,
            Some(LayoutWarning::Underutilized {
                cores_per_node: 8,
                threads_per_process: 3,
                idle_cores_per_node: 2,
            })
        );
        // Warning does not change the layout invariants.
        assert_eq!(result.layout.total_tasks(), 5);
        assert!(result.layout.first_node_task_count <= result.layout.processes_per_node);

        let even = partition(&ResourceRequest::new(5, 4).unwrap(), 8).unwrap();
        assert!(even.warning.is_none());
    }

    proptest! {
        #[test]
        fn prop_layout_invariants(
            (cores, threads) in (1_u32..=128).prop_flat_map(|c| (Just(c), 1..=c)),
            processes in 1_u32..=4096,
        ) {
            let request = ResourceRequest::new(processes, threads).unwrap();
            let layout = partition(&request, cores).unwrap().layout;

            prop_assert!(layout.node_count >= 1);
            prop_assert!(layout.processes_per_node >= 1);
            prop_assert_eq!(layout.total_tasks(), u64::from(processes));
            prop_assert!(layout.first_node_task_count <= layout.processes_per_node);
            prop_assert!(
                u64::from(layout.processes_per_node) * u64::from(threads) <= u64::from(cores)
            );
        }

        #[test]
        fn prop_too_many_threads_rejected(cores in 1_u32..=64, extra in 1_u32..=64, processes in 1_u32..=64) {
            let request = ResourceRequest::new(processes, cores + extra).unwrap();
            prop_assert!(partition(&request, cores).is_err());
        }
    }
}
