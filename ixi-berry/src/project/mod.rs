//! 体数据的轴向统计投影.
//!
//! 每份体数据沿三个轴分别求均值与样本标准差, 得到六张 2D 标量场.

use crate::{ProjAxis, Statistic, Volume};
use ndarray::{Array2, ArrayView1, ArrayView3, Axis, RemoveAxis, Zip};

/// 沿某个轴规约得到的一对标量场.
#[derive(Clone, Debug)]
pub struct AxisProjection {
    /// 算术平均值.
    pub mean: Array2<f64>,

    /// 样本标准差 (除以 N - 1). 若该轴长度小于 2, 则全部为 NaN.
    pub std: Array2<f64>,
}

impl AxisProjection {
    /// 按统计量取出对应的标量场.
    #[inline]
    pub fn get(&self, stat: Statistic) -> &Array2<f64> {
        match stat {
            Statistic::Mean => &self.mean,
            Statistic::Std => &self.std,
        }
    }
}

/// 沿 `axis` (0, 1 或 2) 规约 `volume`, 返回均值与样本标准差.
///
/// 结果形状等于 `volume` 的形状去掉 `axis`, 其余轴保持原顺序.
/// 该函数是纯函数, 不会翻转方向.
///
/// 当 `axis` 越界时 panic.
pub fn reduce(volume: ArrayView3<f32>, axis: usize) -> AxisProjection {
    assert!(axis < 3, "只能沿轴 0, 1 或 2 投影, 但得到了 `{axis}`");
    let shape = volume.raw_dim().remove_axis(Axis(axis));
    let mut mean = Array2::<f64>::zeros(shape);
    let mut std = Array2::<f64>::zeros(shape);

    let zip = Zip::from(&mut mean)
        .and(&mut std)
        .and(volume.lanes(Axis(axis)));

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            zip.par_for_each(|m, s, lane| (*m, *s) = lane_mean_std(lane));
        } else {
            zip.for_each(|m, s, lane| (*m, *s) = lane_mean_std(lane));
        }
    }

    AxisProjection { mean, std }
}

/// 两遍法求均值和样本标准差. 第二遍减去均值, 因此结果与整体平移无关.
fn lane_mean_std(lane: ArrayView1<f32>) -> (f64, f64) {
    let n = lane.len() as f64;
    let mean = lane.iter().map(|&v| v as f64).sum::<f64>() / n;
    if lane.len() < 2 {
        return (mean, f64::NAN);
    }
    let ss: f64 = lane.iter().map(|&v| (v as f64 - mean).powi(2)).sum();
    (mean, (ss / (n - 1.0)).sqrt())
}

/// 一个受试者的全部六张投影, 按 [`ProjAxis`] 索引.
#[derive(Clone, Debug)]
pub struct ProjectionSet {
    axes: [AxisProjection; 3],
}

impl ProjectionSet {
    /// 先沿最后一个轴翻转体数据 (仅一次), 再沿三个轴分别规约.
    pub fn from_volume(volume: Volume) -> Self {
        let oriented = volume.into_oriented();
        let view = oriented.view();
        Self {
            axes: [0, 1, 2].map(|axis| reduce(view, axis)),
        }
    }

    /// 沿 `axis` 的投影.
    #[inline]
    pub fn axis(&self, axis: ProjAxis) -> &AxisProjection {
        &self.axes[axis.index()]
    }

    /// 某一张投影.
    #[inline]
    pub fn get(&self, axis: ProjAxis, stat: Statistic) -> &Array2<f64> {
        self.axis(axis).get(stat)
    }

    /// 按输出顺序迭代六张投影.
    pub fn iter(&self) -> impl Iterator<Item = (ProjAxis, Statistic, &Array2<f64>)> {
        ProjAxis::ALL.into_iter().flat_map(move |axis| {
            Statistic::ALL
                .into_iter()
                .map(move |stat| (axis, stat, self.get(axis, stat)))
        })
    }
}
