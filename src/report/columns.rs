use super::ReportOptions;

/// Columns of the report, in display order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnId {
    Cluster,
    Partition,
    Status,
    FreeCpu,
    TotalCpu,
    WaitingResource,
    WaitingOther,
    FreeNode,
    TotalNode,
    MyRunning,
    MyWaitingResource,
    MyWaitingOther,
    MyTotal,
    MinNodes,
    MaxNodes,
    MaxCpusPerNode,
    DefMem,
    MaxMem,
    DefaultTime,
    MaxTime,
    Cores,
    Memory,
    Qos,
    Gres,
    Features,
}

/// Groups of columns separated by `|` in the main table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnGroup {
    Resources,
    Personal,
    Limits,
}

impl ColumnId {
    pub fn group(&self) -> ColumnGroup {
        match self {
            ColumnId::Cluster
            | ColumnId::Partition
            | ColumnId::Status
            | ColumnId::FreeCpu
            | ColumnId::TotalCpu
            | ColumnId::WaitingResource
            | ColumnId::WaitingOther
            | ColumnId::FreeNode
            | ColumnId::TotalNode => ColumnGroup::Resources,
            ColumnId::MyRunning
            | ColumnId::MyWaitingResource
            | ColumnId::MyWaitingOther
            | ColumnId::MyTotal => ColumnGroup::Personal,
            _ => ColumnGroup::Limits,
        }
    }

    /// Optional columns are moved to the common values when identical for all partitions
    pub fn is_optional(&self) -> bool {
        match self {
            ColumnId::Cluster => true,
            _ => self.group() != ColumnGroup::Resources,
        }
    }

    /// Partition limits that are hidden unless at least one partition deviates from the default
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ColumnId::MinNodes
                | ColumnId::MaxNodes
                | ColumnId::MaxCpusPerNode
                | ColumnId::DefMem
                | ColumnId::MaxMem
                | ColumnId::DefaultTime
                | ColumnId::MaxTime
                | ColumnId::Qos
        )
    }

    /// Name used for the column in machine readable output
    pub fn key(&self) -> &'static str {
        match self {
            ColumnId::Cluster => "cluster",
            ColumnId::Partition => "partition",
            ColumnId::Status => "status",
            ColumnId::FreeCpu => "free_cpu",
            ColumnId::TotalCpu => "total_cpu",
            ColumnId::WaitingResource => "waiting_resource",
            ColumnId::WaitingOther => "waiting_other",
            ColumnId::FreeNode => "free_node",
            ColumnId::TotalNode => "total_node",
            ColumnId::MyRunning => "my_running",
            ColumnId::MyWaitingResource => "my_waiting_resource",
            ColumnId::MyWaitingOther => "my_waiting_other",
            ColumnId::MyTotal => "my_total",
            ColumnId::MinNodes => "min_nodes",
            ColumnId::MaxNodes => "max_nodes",
            ColumnId::MaxCpusPerNode => "max_cpus_per_node",
            ColumnId::DefMem => "def_mem_gb",
            ColumnId::MaxMem => "max_mem_gb",
            ColumnId::DefaultTime => "default_time",
            ColumnId::MaxTime => "max_time",
            ColumnId::Cores => "cores",
            ColumnId::Memory => "node_mem_gb",
            ColumnId::Qos => "qos",
            ColumnId::Gres => "gres",
            ColumnId::Features => "features",
        }
    }
}

/// Header lines, width, and default visibility of every column
const COLUMNS: &[(ColumnId, &str, &str, usize, bool)] = &[
    (ColumnId::Cluster, " CLUSTER", "    NAME", 8, false),
    (ColumnId::Partition, "     QUEUE", " PARTITION", 10, true),
    (ColumnId::Status, "STA", "TUS", 3, true),
    (ColumnId::FreeCpu, "  FREE", " CORES", 6, true),
    (ColumnId::TotalCpu, " TOTAL", " CORES", 6, true),
    (ColumnId::WaitingResource, "RESORC", "PENDNG", 6, true),
    (ColumnId::WaitingOther, " OTHER", "PENDNG", 6, true),
    (ColumnId::FreeNode, "  FREE", " NODES", 6, true),
    (ColumnId::TotalNode, " TOTAL", " NODES", 6, true),
    (ColumnId::MyRunning, "YOUR", " RUN", 4, true),
    (ColumnId::MyWaitingResource, "PEND", " RES", 4, true),
    (ColumnId::MyWaitingOther, "PEND", "OTHR", 4, true),
    (ColumnId::MyTotal, "YOUR", "TOTL", 4, true),
    (ColumnId::MinNodes, "  MIN", "NODES", 5, true),
    (ColumnId::MaxNodes, "  MAX", "NODES", 5, true),
    (ColumnId::MaxCpusPerNode, "MAXCPU", " /NODE", 6, false),
    (ColumnId::DefMem, "DEFMEM", "GB/CPU", 6, false),
    (ColumnId::MaxMem, "MAXMEM", "GB/CPU", 6, false),
    (ColumnId::DefaultTime, "   DEFAULT", "  JOB-TIME", 10, false),
    (ColumnId::MaxTime, "   MAXIMUM", "  JOB-TIME", 10, true),
    (ColumnId::Cores, " CORES", " /NODE", 6, true),
    (ColumnId::Memory, "  NODE", "MEM-GB", 6, true),
    (ColumnId::Qos, "   QOS", "  NAME", 6, true),
    (ColumnId::Gres, " GRES       ", "(NODE-COUNT)", 12, false),
    (ColumnId::Features, " FEATURES   ", "(NODE-COUNT)", 12, false),
];

/// Definition of a single column
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnSpec {
    pub id: ColumnId,
    pub line1: String,
    pub line2: String,
    pub width: usize,
    pub visible: bool,
}

/// The ordered set of columns of a report
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnModel {
    columns: Vec<ColumnSpec>,
}

impl ColumnModel {
    /// Builds the columns and applies the visibility implied by the command-line flags
    pub fn new(options: &ReportOptions) -> Self {
        let mut model = ColumnModel {
            columns: COLUMNS
                .iter()
                .map(|&(id, line1, line2, width, visible)| ColumnSpec {
                    id,
                    line1: line1.to_string(),
                    line2: line2.to_string(),
                    width,
                    visible,
                })
                .collect(),
        };

        if options.long {
            for column in &mut model.columns {
                if column.id.group() == ColumnGroup::Limits {
                    column.visible = true;
                }
            }
        }

        model.set_visible(ColumnId::Cluster, options.federation);
        if options.gres {
            model.set_visible(ColumnId::Gres, true);
        }
        model.set_visible(ColumnId::Features, options.features);

        if options.both_extrema || options.long {
            model.set_width(ColumnId::Cores, 8);
            model.set_width(ColumnId::Memory, 10);
        }

        if options.simple {
            for column in &mut model.columns {
                if column.id.group() == ColumnGroup::Limits {
                    column.visible = false;
                }
            }
        }

        if options.no_jobs {
            for column in &mut model.columns {
                if column.id.group() == ColumnGroup::Personal {
                    column.visible = false;
                }
            }
        }

        model
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter()
    }

    /// Columns currently marked as visible, in display order
    pub fn visible(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|column| column.visible)
    }

    pub fn get(&self, id: ColumnId) -> Option<&ColumnSpec> {
        self.columns.iter().find(|column| column.id == id)
    }

    pub fn get_mut(&mut self, id: ColumnId) -> Option<&mut ColumnSpec> {
        self.columns.iter_mut().find(|column| column.id == id)
    }

    pub fn is_visible(&self, id: ColumnId) -> bool {
        self.get(id).is_some_and(|column| column.visible)
    }

    pub fn set_visible(&mut self, id: ColumnId, visible: bool) {
        if let Some(column) = self.get_mut(id) {
            column.visible = visible;
        }
    }

    pub fn set_width(&mut self, id: ColumnId, width: usize) {
        if let Some(column) = self.get_mut(id) {
            column.width = width;
        }
    }
}
